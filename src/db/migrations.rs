// src/db/migrations.rs
//! Repository schema migrations
//!
//! The layout mirrors the Conary repository server: interned strings
//! (`Items`, `Versions`, `Flavors`, `Branches`, `Labels`), the version graph
//! (`Nodes`, `Instances`), per-role visibility caches (`LatestCache`,
//! `UserGroupInstancesCache`), trove contents (`TroveFiles`, `TroveTroves`)
//! and file records (`FileStreams`).

use crate::error::Result;
use rusqlite::Connection;
use tracing::{debug, info};

/// Initial schema - Version 1
pub fn migrate_v1(conn: &Connection) -> Result<()> {
    debug!("Creating repository schema version 1");

    conn.execute_batch(
        "
        CREATE TABLE Items (
            itemId INTEGER PRIMARY KEY AUTOINCREMENT,
            item TEXT NOT NULL UNIQUE
        );

        CREATE TABLE Versions (
            versionId INTEGER PRIMARY KEY AUTOINCREMENT,
            version TEXT NOT NULL UNIQUE
        );

        -- Frozen flavor strings; the empty flavor is ''
        CREATE TABLE Flavors (
            flavorId INTEGER PRIMARY KEY AUTOINCREMENT,
            flavor TEXT NOT NULL UNIQUE
        );

        CREATE TABLE Branches (
            branchId INTEGER PRIMARY KEY AUTOINCREMENT,
            branch TEXT NOT NULL UNIQUE
        );

        CREATE TABLE Labels (
            labelId INTEGER PRIMARY KEY AUTOINCREMENT,
            label TEXT NOT NULL UNIQUE
        );

        CREATE TABLE LabelMap (
            itemId INTEGER NOT NULL REFERENCES Items(itemId),
            labelId INTEGER NOT NULL REFERENCES Labels(labelId),
            branchId INTEGER NOT NULL REFERENCES Branches(branchId),
            UNIQUE(itemId, labelId, branchId)
        );

        -- One node per (item, version) on a branch
        CREATE TABLE Nodes (
            nodeId INTEGER PRIMARY KEY AUTOINCREMENT,
            itemId INTEGER NOT NULL REFERENCES Items(itemId),
            branchId INTEGER NOT NULL REFERENCES Branches(branchId),
            versionId INTEGER NOT NULL REFERENCES Versions(versionId),
            sourceItemId INTEGER REFERENCES Items(itemId),
            timeStamps TEXT,
            finalTimestamp NUMERIC NOT NULL,
            UNIQUE(itemId, versionId)
        );

        CREATE INDEX NodesItemBranchIdx ON Nodes(itemId, branchId);

        CREATE TABLE Instances (
            instanceId INTEGER PRIMARY KEY AUTOINCREMENT,
            itemId INTEGER NOT NULL REFERENCES Items(itemId),
            versionId INTEGER NOT NULL REFERENCES Versions(versionId),
            flavorId INTEGER NOT NULL REFERENCES Flavors(flavorId),
            isPresent INTEGER NOT NULL DEFAULT 1,
            UNIQUE(itemId, versionId, flavorId)
        );

        -- Latest version per (item, branch, flavor) visible to each role
        CREATE TABLE LatestCache (
            itemId INTEGER NOT NULL REFERENCES Items(itemId),
            branchId INTEGER NOT NULL REFERENCES Branches(branchId),
            flavorId INTEGER NOT NULL REFERENCES Flavors(flavorId),
            versionId INTEGER NOT NULL REFERENCES Versions(versionId),
            userGroupId INTEGER NOT NULL,
            latestType INTEGER NOT NULL,
            UNIQUE(userGroupId, itemId, branchId, flavorId, latestType)
        );

        CREATE INDEX LatestCacheRoleIdx ON LatestCache(userGroupId, latestType);

        CREATE TABLE UserGroupInstancesCache (
            userGroupId INTEGER NOT NULL,
            instanceId INTEGER NOT NULL REFERENCES Instances(instanceId),
            UNIQUE(userGroupId, instanceId)
        );

        CREATE INDEX UGICacheInstanceIdx ON UserGroupInstancesCache(instanceId);

        CREATE TABLE TroveInfo (
            instanceId INTEGER NOT NULL REFERENCES Instances(instanceId),
            infoType INTEGER NOT NULL,
            data BLOB
        );

        CREATE INDEX TroveInfoIdx ON TroveInfo(instanceId, infoType);

        CREATE TABLE DirNames (
            dirNameId INTEGER PRIMARY KEY AUTOINCREMENT,
            dirName TEXT NOT NULL UNIQUE
        );

        CREATE TABLE Basenames (
            baseNameId INTEGER PRIMARY KEY AUTOINCREMENT,
            baseName TEXT NOT NULL UNIQUE
        );

        CREATE TABLE FilePaths (
            filePathId INTEGER PRIMARY KEY AUTOINCREMENT,
            dirNameId INTEGER NOT NULL REFERENCES DirNames(dirNameId),
            baseNameId INTEGER NOT NULL REFERENCES Basenames(baseNameId),
            pathId BLOB NOT NULL,
            UNIQUE(dirNameId, baseNameId, pathId)
        );

        -- fileId is the 20 byte content id; stream is a frozen file record
        CREATE TABLE FileStreams (
            streamId INTEGER PRIMARY KEY AUTOINCREMENT,
            fileId BLOB NOT NULL UNIQUE,
            stream BLOB
        );

        CREATE TABLE TroveFiles (
            instanceId INTEGER NOT NULL REFERENCES Instances(instanceId),
            streamId INTEGER NOT NULL REFERENCES FileStreams(streamId),
            versionId INTEGER NOT NULL REFERENCES Versions(versionId),
            filePathId INTEGER NOT NULL REFERENCES FilePaths(filePathId)
        );

        CREATE INDEX TroveFilesInstanceIdx ON TroveFiles(instanceId);
        CREATE INDEX TroveFilesStreamIdx ON TroveFiles(streamId);

        CREATE TABLE TroveTroves (
            instanceId INTEGER NOT NULL REFERENCES Instances(instanceId),
            includedId INTEGER NOT NULL REFERENCES Instances(instanceId),
            flags INTEGER NOT NULL DEFAULT 0,
            UNIQUE(instanceId, includedId)
        );

        CREATE TABLE ChangeLogs (
            nodeId INTEGER NOT NULL REFERENCES Nodes(nodeId),
            name TEXT,
            contact TEXT,
            message TEXT,
            UNIQUE(nodeId)
        );
        ",
    )?;

    info!("Repository schema version 1 created successfully");
    Ok(())
}
