// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.
//!
//! Builds small repository databases by writing the repository tables
//! directly, the way the repository server would have left them.

#![allow(dead_code)]

use bzip2::write::BzEncoder;
use crest::db;
use crest::db::stream::{ContentsStream, DeviceStream, FrozenFile, InodeStream, FILE_FLAG_CONFIG};
use crest::db::troveinfo::{encode_int, encode_version_list, Metadata, TroveInfoTag};
use crest::version::VersionString;
use crest::{BaseUrl, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use rusqlite::{params, Connection};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const ROLE_A: i64 = 1;
pub const ROLE_B: i64 = 2;

pub const HOST_LABEL: &str = "host@ns:1";
pub const OTHER_LABEL: &str = "other@ns:2";

pub const FOO_VERSION: &str = "/host@ns:1/1-1-1";
pub const BAR_VERSION: &str = "/host@ns:1/2.0-1-1";
pub const BAR_OLD_VERSION: &str = "/host@ns:1/1.0-1-1";

pub const X86: &str = "1#x86";
pub const X86_64: &str = "1#x86_64";

/// Content ids used by the standard repository
pub const FOO_BIN_ID: [u8; 20] = [0x01; 20];
pub const FOO_DATA_ID: [u8; 20] = [0x02; 20];
pub const BAR_LIB_ID: [u8; 20] = [0x03; 20];
pub const BAR_LINK_ID: [u8; 20] = [0x04; 20];
pub const BAR_CONF_ID: [u8; 20] = [0x05; 20];
pub const BAR_LOG_ID: [u8; 20] = [0x06; 20];

pub const BAR_CLONED_FROM: &str = "/old@ns:1/1200.000:2.0-1-1";
pub const BAR_CLONE_LIST: [&str; 2] = ["/other@ns:2/1100.500:2.0-1-1", "/other@ns:2/0.000:1.9-1-1"];

pub const LOG_TEXT: &str = "+ make\n+ make install\nbuild finished\n";

pub fn urls() -> BaseUrl {
    BaseUrl::parse("http://localhost:9000/api/").unwrap()
}

pub fn hex_id(id: &[u8]) -> String {
    hex::encode(id)
}

/// A repository on disk: database plus content store
pub struct TestRepo {
    pub dir: TempDir,
    pub db_path: PathBuf,
    pub contents: PathBuf,
}

impl TestRepo {
    /// Create an empty repository with the current schema
    pub fn empty() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("sqldb");
        let contents = dir.path().join("contents");
        std::fs::create_dir_all(&contents).unwrap();

        db::init(&db_path).unwrap();

        Self {
            dir,
            db_path,
            contents,
        }
    }

    /// Populate the repository inside one transaction
    pub fn build<F>(&self, f: F)
    where
        F: FnOnce(&RepoBuilder) -> Result<()>,
    {
        let mut conn = db::open_rw(&self.db_path).unwrap();
        db::transaction(&mut conn, |tx| f(&RepoBuilder { conn: tx })).unwrap();
    }

    /// Store a blob in the content store the way the repository does
    pub fn store_content(&self, sha1: &[u8], data: &[u8]) {
        let hash = hex_id(sha1);
        let path = self.contents.join(&hash[..2]).join(&hash[2..]);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();

        let mut gz = GzEncoder::new(Vec::new(), Compression::default());
        gz.write_all(data).unwrap();
        std::fs::write(path, gz.finish().unwrap()).unwrap();
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

/// Writes repository rows
pub struct RepoBuilder<'a> {
    conn: &'a Connection,
}

impl RepoBuilder<'_> {
    fn intern(&self, table: &str, id_col: &str, col: &str, value: &str) -> Result<i64> {
        self.conn.execute(
            &format!("INSERT OR IGNORE INTO {table} ({col}) VALUES (?1)"),
            [value],
        )?;
        Ok(self.conn.query_row(
            &format!("SELECT {id_col} FROM {table} WHERE {col} = ?1"),
            [value],
            |row| row.get(0),
        )?)
    }

    /// Add a trove instance; returns its instance id
    ///
    /// `latest` marks it as the newest version on its branch for every role.
    pub fn add_trove(
        &self,
        name: &str,
        version: &str,
        frozen_flavor: &str,
        timestamp: f64,
        roles: &[i64],
        latest: bool,
    ) -> Result<i64> {
        let parsed = VersionString::parse(version)?;
        let label = parsed.trailing_label().to_string();

        let item_id = self.intern("Items", "itemId", "item", name)?;
        let version_id = self.intern("Versions", "versionId", "version", version)?;
        let flavor_id = self.intern("Flavors", "flavorId", "flavor", frozen_flavor)?;
        let branch_id = self.intern("Branches", "branchId", "branch", parsed.branch())?;
        let label_id = self.intern("Labels", "labelId", "label", &label)?;

        self.conn.execute(
            "INSERT OR IGNORE INTO LabelMap (itemId, labelId, branchId) VALUES (?1, ?2, ?3)",
            params![item_id, label_id, branch_id],
        )?;
        self.conn.execute(
            "INSERT OR IGNORE INTO Nodes (itemId, branchId, versionId, finalTimestamp)
             VALUES (?1, ?2, ?3, ?4)",
            params![item_id, branch_id, version_id, timestamp],
        )?;
        self.conn.execute(
            "INSERT INTO Instances (itemId, versionId, flavorId) VALUES (?1, ?2, ?3)",
            params![item_id, version_id, flavor_id],
        )?;
        let instance_id = self.conn.last_insert_rowid();

        for role in roles {
            self.conn.execute(
                "INSERT INTO UserGroupInstancesCache (userGroupId, instanceId) VALUES (?1, ?2)",
                params![role, instance_id],
            )?;
            if latest {
                self.conn.execute(
                    "INSERT OR REPLACE INTO LatestCache
                        (itemId, branchId, flavorId, versionId, userGroupId, latestType)
                     VALUES (?1, ?2, ?3, ?4, ?5, 1)",
                    params![item_id, branch_id, flavor_id, version_id, role],
                )?;
            }
        }

        Ok(instance_id)
    }

    pub fn set_info(&self, instance_id: i64, tag: TroveInfoTag, data: &[u8]) -> Result<()> {
        self.conn.execute(
            "INSERT INTO TroveInfo (instanceId, infoType, data) VALUES (?1, ?2, ?3)",
            params![instance_id, tag.id(), data],
        )?;
        Ok(())
    }

    pub fn set_build_time(&self, instance_id: i64, build_time: u64) -> Result<()> {
        self.set_info(instance_id, TroveInfoTag::BuildTime, &encode_int(build_time))
    }

    /// Attach a file to a trove
    pub fn add_file(
        &self,
        instance_id: i64,
        path: &str,
        version: &str,
        path_id: &[u8],
        file_id: &[u8],
        file: &FrozenFile,
    ) -> Result<()> {
        let (dir, base) = path.rsplit_once('/').unwrap_or(("", path));
        let dir = if dir.is_empty() { "/" } else { dir };

        let dir_id = self.intern("DirNames", "dirNameId", "dirName", dir)?;
        let base_id = self.intern("Basenames", "baseNameId", "baseName", base)?;
        let version_id = self.intern("Versions", "versionId", "version", version)?;

        self.conn.execute(
            "INSERT OR IGNORE INTO FilePaths (dirNameId, baseNameId, pathId) VALUES (?1, ?2, ?3)",
            params![dir_id, base_id, path_id],
        )?;
        let file_path_id: i64 = self.conn.query_row(
            "SELECT filePathId FROM FilePaths WHERE dirNameId = ?1 AND baseNameId = ?2 AND pathId = ?3",
            params![dir_id, base_id, path_id],
            |row| row.get(0),
        )?;

        self.conn.execute(
            "INSERT OR IGNORE INTO FileStreams (fileId, stream) VALUES (?1, ?2)",
            params![file_id, file.freeze()?],
        )?;
        let stream_id: i64 = self.conn.query_row(
            "SELECT streamId FROM FileStreams WHERE fileId = ?1",
            params![file_id],
            |row| row.get(0),
        )?;

        self.conn.execute(
            "INSERT INTO TroveFiles (instanceId, streamId, versionId, filePathId)
             VALUES (?1, ?2, ?3, ?4)",
            params![instance_id, stream_id, version_id, file_path_id],
        )?;
        Ok(())
    }

    /// Record `child` as directly included by `parent`
    pub fn include(&self, parent: i64, child: i64) -> Result<()> {
        self.conn.execute(
            "INSERT INTO TroveTroves (instanceId, includedId) VALUES (?1, ?2)",
            params![parent, child],
        )?;
        Ok(())
    }

    /// Run raw SQL, for seeding records the builders would never write
    pub fn execute(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    pub fn add_changelog(&self, name: &str, version: &str, message: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO ChangeLogs (nodeId, name, contact, message)
             SELECT nodeId, 'Test Builder', 'builder@example.com', ?3 FROM Nodes
                JOIN Items ON Items.itemId = Nodes.itemId
                JOIN Versions ON Versions.versionId = Nodes.versionId
             WHERE Items.item = ?1 AND Versions.version = ?2",
            params![name, version, message],
        )?;
        Ok(())
    }
}

fn inode(perms: u32) -> InodeStream {
    InodeStream {
        owner: "root".to_string(),
        group: "root".to_string(),
        mtime: 1_234_567_890,
        perms,
    }
}

pub fn regular_file(size: u64, sha1: &[u8]) -> FrozenFile {
    FrozenFile {
        tag: '-',
        inode: inode(0o644),
        flags: 0,
        contents: Some(ContentsStream {
            size,
            sha1: sha1.to_vec(),
        }),
        target: None,
        devt: None,
    }
}

pub fn config_file(size: u64, sha1: &[u8]) -> FrozenFile {
    FrozenFile {
        flags: FILE_FLAG_CONFIG,
        ..regular_file(size, sha1)
    }
}

pub fn symlink(target: &str) -> FrozenFile {
    FrozenFile {
        tag: 'l',
        inode: inode(0o777),
        flags: 0,
        contents: None,
        target: Some(target.to_string()),
        devt: None,
    }
}

pub fn char_device(major: u32, minor: u32) -> FrozenFile {
    FrozenFile {
        tag: 'c',
        inode: inode(0o600),
        flags: 0,
        contents: None,
        target: None,
        devt: Some(DeviceStream { major, minor }),
    }
}

pub fn tagged(tag: char) -> FrozenFile {
    FrozenFile {
        tag,
        inode: inode(0o755),
        flags: 0,
        contents: None,
        target: None,
        devt: None,
    }
}

/// bzip2 inside gzip, the way build logs are stored
pub fn stored_log(text: &str) -> Vec<u8> {
    let mut bz = BzEncoder::new(Vec::new(), bzip2::Compression::default());
    bz.write_all(text.as_bytes()).unwrap();
    bz.finish().unwrap()
}

/// The repository most tests run against
///
/// Label host@ns:1:
/// - foo=1-1-1[is: x86], role A, two files, includes foo:runtime
/// - foo:runtime=1-1-1[is: x86], roles A and B
/// - foo:source=1-1, roles A and B
/// - bar=2.0-1-1 in two flavors, roles A and B, build time 0, cloned
/// - bar=1.0-1-1[is: x86], older, roles A and B
/// - group-dist=1-1-1, role B
///
/// Label other@ns:2:
/// - baz=1.0-1-1, role A
pub fn setup_standard_repo() -> TestRepo {
    let repo = TestRepo::empty();

    repo.build(|b| {
        let foo = b.add_trove("foo", FOO_VERSION, X86, 1000.0, &[ROLE_A], true)?;
        b.set_build_time(foo, 1_234_567_890)?;
        // Inserted out of path order on purpose
        b.add_file(foo, "/usr/share/foo/data", FOO_VERSION, &[0x12; 16], &FOO_DATA_ID, &regular_file(10, &[0xd0; 20]))?;
        b.add_file(foo, "/usr/bin/foo", FOO_VERSION, &[0x11; 16], &FOO_BIN_ID, &regular_file(2048, &[0xb1; 20]))?;

        let runtime = b.add_trove("foo:runtime", FOO_VERSION, X86, 1000.0, &[ROLE_A, ROLE_B], true)?;
        b.set_build_time(runtime, 1_234_567_890)?;
        b.include(foo, runtime)?;

        let source = b.add_trove("foo:source", "/host@ns:1/1-1", "", 900.0, &[ROLE_A, ROLE_B], true)?;
        b.set_build_time(source, 1_234_500_000)?;

        let bar_old = b.add_trove("bar", BAR_OLD_VERSION, X86, 1500.0, &[ROLE_A, ROLE_B], false)?;
        b.set_build_time(bar_old, 1_000_000)?;

        let bar = b.add_trove("bar", BAR_VERSION, X86, 2000.0, &[ROLE_A, ROLE_B], true)?;
        b.set_build_time(bar, 0)?;
        b.set_info(bar, TroveInfoTag::SourceName, b"bar:source")?;
        b.set_info(bar, TroveInfoTag::ClonedFrom, BAR_CLONED_FROM.as_bytes())?;
        b.set_info(bar, TroveInfoTag::ClonedFromList, &encode_version_list(&BAR_CLONE_LIST))?;
        b.set_info(
            bar,
            TroveInfoTag::Metadata,
            &Metadata {
                short_desc: Some("The bar library".to_string()),
                ..Default::default()
            }
            .freeze()?,
        )?;
        b.add_file(bar, "/usr/lib/libbar.so.2", BAR_VERSION, &[0x21; 16], &BAR_LIB_ID, &regular_file(4096, &[0xb2; 20]))?;
        b.add_file(bar, "/usr/lib/libbar.so", BAR_VERSION, &[0x22; 16], &BAR_LINK_ID, &symlink("libbar.so.2"))?;
        b.add_file(bar, "/etc/bar.conf", BAR_VERSION, &[0x23; 16], &BAR_CONF_ID, &config_file(64, &[0xc0; 20]))?;
        b.add_file(bar, "/usr/share/bar/build.log", BAR_VERSION, &[0x24; 16], &BAR_LOG_ID, &regular_file(LOG_TEXT.len() as u64, &[0x10; 20]))?;

        let bar64 = b.add_trove("bar", BAR_VERSION, X86_64, 2000.0, &[ROLE_A, ROLE_B], true)?;
        b.set_build_time(bar64, 0)?;
        b.add_changelog("bar", BAR_VERSION, "Update to 2.0")?;

        let group = b.add_trove("group-dist", FOO_VERSION, "", 3000.0, &[ROLE_B], true)?;
        b.set_build_time(group, 1_234_567_999)?;
        b.include(group, bar)?;

        let baz = b.add_trove("baz", "/other@ns:2/1.0-1-1", "", 500.0, &[ROLE_A], true)?;
        b.set_build_time(baz, 500)?;

        Ok(())
    });

    repo.store_content(&[0x10; 20], &stored_log(LOG_TEXT));
    repo.store_content(&[0xc0; 20], b"listen = 80\n");

    repo
}
