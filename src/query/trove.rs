// src/query/trove.rs

//! Trove assembler
//!
//! Builds the full document for one (name, version, flavor) instance:
//! trove info, source linkage, clone history, files and directly included
//! troves. Included troves are listed as identities only.

use super::ident_from_row;
use crate::db::troveinfo::TroveInfoSet;
use crate::error::{Error, Result, StoredValue};
use crate::flavor::FlavorSpec;
use crate::model::{FileInTrove, SingleTrove, TroveCollection, TroveIdent};
use crate::scope::RoleScope;
use crate::url::UrlBuilder;
use crate::version::{VersionInfo, VersionString};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};
use tracing::debug;

const PATH_ID_LEN: usize = 16;
const FILE_ID_LEN: usize = 20;

/// Instance id and ordering of one resolved trove
struct Instance {
    id: i64,
    flavor: String,
    timestamp: f64,
}

/// Assemble one trove; `Ok(None)` if the triple is not visible to `scope`
///
/// `flavor` is a flavor expression in any spelling; it is matched in
/// frozen form.
pub fn get_trove(
    conn: &Connection,
    scope: &RoleScope,
    name: &str,
    version: &str,
    flavor: &str,
    urls: Option<&dyn UrlBuilder>,
) -> Result<Option<SingleTrove>> {
    let frozen = FlavorSpec::parse(flavor)?.freeze();
    debug!("Resolving trove {}={}[{}]", name, version, flavor);

    let instances = find_instances(conn, scope, name, version, Some(&frozen))?;
    match instances.into_iter().next() {
        Some(instance) => assemble(conn, name, version, &instance, urls).map(Some),
        None => Ok(None),
    }
}

/// Assemble every flavor of `name=version` visible to `scope`
pub fn get_troves(
    conn: &Connection,
    scope: &RoleScope,
    name: &str,
    version: &str,
    urls: Option<&dyn UrlBuilder>,
) -> Result<Option<TroveCollection>> {
    let instances = find_instances(conn, scope, name, version, None)?;
    if instances.is_empty() {
        return Ok(None);
    }

    let troves = instances
        .iter()
        .map(|instance| assemble(conn, name, version, instance, urls))
        .collect::<Result<Vec<_>>>()?;
    Ok(Some(TroveCollection { troves }))
}

fn find_instances(
    conn: &Connection,
    scope: &RoleScope,
    name: &str,
    version: &str,
    frozen_flavor: Option<&str>,
) -> Result<Vec<Instance>> {
    let mut args = scope.params();
    args.push(Value::Text(name.to_string()));
    args.push(Value::Text(version.to_string()));

    let flavor_check = match frozen_flavor {
        Some(frozen) => {
            args.push(Value::Text(frozen.to_string()));
            "AND Flavors.flavor = ?"
        }
        None => "",
    };

    let sql = format!(
        "SELECT DISTINCT Instances.instanceId, Flavors.flavor, Nodes.finalTimestamp
            FROM Instances
            JOIN Items ON Items.itemId = Instances.itemId
            JOIN Versions ON Versions.versionId = Instances.versionId
            JOIN Flavors ON Flavors.flavorId = Instances.flavorId
            JOIN Nodes ON Nodes.itemId = Instances.itemId
                      AND Nodes.versionId = Instances.versionId
            JOIN UserGroupInstancesCache AS ugi
                 ON ugi.instanceId = Instances.instanceId
                AND ugi.userGroupId IN ({})
            WHERE Items.item = ? AND Versions.version = ? {flavor_check}
            ORDER BY Flavors.flavor",
        scope.placeholders()
    );

    let mut stmt = conn.prepare(&sql)?;
    let instances = stmt
        .query_map(params_from_iter(args), |row| {
            Ok(Instance {
                id: row.get(0)?,
                flavor: row.get(1)?,
                timestamp: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(instances)
}

fn assemble(
    conn: &Connection,
    name: &str,
    version: &str,
    instance: &Instance,
    urls: Option<&dyn UrlBuilder>,
) -> Result<SingleTrove> {
    let ident = ident_from_row(name, version, &instance.flavor, Some(instance.timestamp), urls)?;
    let info = load_trove_info(conn, instance.id)?;

    let build_time = info
        .build_time
        .ok_or_else(|| Error::MissingBuildTime(ident.key()))?;

    let mut trove = SingleTrove::new(ident, build_time);

    if let Some(ref source_name) = info.source_name {
        let source_version = VersionString::parse(version).stored("version")?.source_version();
        // Synthesized, so there is no stored timestamp to order it by
        let version = VersionInfo::parse(&source_version).stored("source version")?;
        trove.source = Some(TroveIdent::new(source_name.as_str(), version, "", urls));
    }

    for cloned in info.clone_history() {
        let version = VersionInfo::parse(&cloned).stored("cloned-from version")?;
        let flavor = trove.ident.flavor.clone();
        trove.add_cloned_from(TroveIdent::new(name, version, flavor, urls));
    }

    for file in load_files(conn, instance.id, urls)? {
        trove.add_file(file);
    }

    for sub in load_referenced_troves(conn, instance.id, urls)? {
        trove.add_referenced_trove(sub);
    }

    debug!(
        "Assembled {} with {} files and {} troves",
        trove.ident.key(),
        trove.files.len(),
        trove.troves.len()
    );
    Ok(trove)
}

fn load_trove_info(conn: &Connection, instance_id: i64) -> Result<TroveInfoSet> {
    let tags: Vec<String> = TroveInfoSet::TAGS.iter().map(|t| t.id().to_string()).collect();
    let sql = format!(
        "SELECT infoType, data FROM TroveInfo WHERE instanceId = ?1 AND infoType IN ({})",
        tags.join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![instance_id], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, Option<Vec<u8>>>(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    TroveInfoSet::from_rows(rows)
}

fn join_path(dir: &str, base: &str) -> String {
    if dir.ends_with('/') {
        format!("{dir}{base}")
    } else {
        format!("{dir}/{base}")
    }
}

fn encode_id(kind: &str, bytes: &[u8], expected: usize, path: &str) -> Result<String> {
    if bytes.len() != expected {
        return Err(Error::CorruptRecord(format!(
            "{kind} for {path} is {} bytes, expected {expected}",
            bytes.len()
        )));
    }
    Ok(hex::encode(bytes))
}

fn load_files(
    conn: &Connection,
    instance_id: i64,
    urls: Option<&dyn UrlBuilder>,
) -> Result<Vec<FileInTrove>> {
    let mut stmt = conn.prepare(
        "SELECT DirNames.dirName, Basenames.baseName, Versions.version,
                FilePaths.pathId, FileStreams.fileId
            FROM TroveFiles
            JOIN Versions ON Versions.versionId = TroveFiles.versionId
            JOIN FileStreams ON FileStreams.streamId = TroveFiles.streamId
            JOIN FilePaths ON FilePaths.filePathId = TroveFiles.filePathId
            JOIN DirNames ON DirNames.dirNameId = FilePaths.dirNameId
            JOIN Basenames ON Basenames.baseNameId = FilePaths.baseNameId
            WHERE TroveFiles.instanceId = ?1
            ORDER BY DirNames.dirName, Basenames.baseName",
    )?;

    let rows = stmt
        .query_map(params![instance_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<Vec<u8>>>(3)?,
                row.get::<_, Option<Vec<u8>>>(4)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut files = Vec::with_capacity(rows.len());
    for (dir, base, version, path_id, file_id) in rows {
        let path = join_path(&dir, &base);
        let path_id = path_id
            .ok_or_else(|| Error::CorruptRecord(format!("missing path id for {path}")))?;
        let file_id = file_id
            .ok_or_else(|| Error::CorruptRecord(format!("missing file id for {path}")))?;

        let path_id = encode_id("path id", &path_id, PATH_ID_LEN, &path)?;
        let file_id = encode_id("file id", &file_id, FILE_ID_LEN, &path)?;
        let host = VersionString::parse(&version)
            .stored("file version")?
            .host()
            .to_string();

        files.push(FileInTrove::new(path, version, path_id, file_id, Some(&host), urls));
    }

    Ok(files)
}

fn load_referenced_troves(
    conn: &Connection,
    instance_id: i64,
    urls: Option<&dyn UrlBuilder>,
) -> Result<Vec<TroveIdent>> {
    let mut stmt = conn.prepare(
        "SELECT Items.item, Versions.version, Flavors.flavor, Nodes.finalTimestamp
            FROM TroveTroves
            JOIN Instances ON Instances.instanceId = TroveTroves.includedId
            JOIN Items ON Items.itemId = Instances.itemId
            JOIN Versions ON Versions.versionId = Instances.versionId
            JOIN Flavors ON Flavors.flavorId = Instances.flavorId
            LEFT JOIN Nodes ON Nodes.itemId = Instances.itemId
                           AND Nodes.versionId = Instances.versionId
            WHERE TroveTroves.instanceId = ?1
            ORDER BY Items.item, Versions.version, Flavors.flavor",
    )?;

    let rows = stmt
        .query_map(params![instance_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<f64>>(3)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(name, version, flavor, timestamp)| {
            ident_from_row(name, &version, &flavor, timestamp, urls)
        })
        .collect()
}
