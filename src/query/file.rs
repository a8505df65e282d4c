// src/query/file.rs

//! File resolver
//!
//! Files are addressed by their 20 byte content id. The same content id
//! can appear in many troves; the record from the newest visible node wins.

use crate::db::stream::FrozenFile;
use crate::error::{Error, Result};
use crate::model::{FileContentInfo, FileDescriptor};
use crate::scope::RoleScope;
use crate::url::UrlBuilder;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use tracing::debug;

const FILE_ID_LEN: usize = 20;

/// Decode a hex file id into its stored binary form
pub fn parse_file_id(file_id: &str) -> Result<Vec<u8>> {
    let bytes = hex::decode(file_id)
        .map_err(|e| Error::InvalidFileId(format!("{file_id}: {e}")))?;
    if bytes.len() != FILE_ID_LEN {
        return Err(Error::InvalidFileId(format!(
            "{file_id}: {} bytes, expected {FILE_ID_LEN}",
            bytes.len()
        )));
    }
    Ok(bytes)
}

fn load_stream(conn: &Connection, scope: &RoleScope, file_id: &str) -> Result<Option<FrozenFile>> {
    let mut args = vec![Value::Blob(parse_file_id(file_id)?)];
    args.extend(scope.params());

    let sql = format!(
        "SELECT FileStreams.stream
            FROM FileStreams
            JOIN TroveFiles ON TroveFiles.streamId = FileStreams.streamId
            JOIN UserGroupInstancesCache AS ugi
                 ON ugi.instanceId = TroveFiles.instanceId
            JOIN Instances ON Instances.instanceId = TroveFiles.instanceId
            JOIN Nodes ON Nodes.itemId = Instances.itemId
                      AND Nodes.versionId = Instances.versionId
            WHERE FileStreams.stream IS NOT NULL
              AND FileStreams.fileId = ?
              AND ugi.userGroupId IN ({})
            ORDER BY Nodes.finalTimestamp DESC
            LIMIT 1",
        scope.placeholders()
    );

    debug!("Looking up file stream {}", file_id);

    let stream = conn
        .query_row(&sql, params_from_iter(args), |row| row.get::<_, Vec<u8>>(0))
        .optional()?;

    stream.map(|s| FrozenFile::thaw(&s)).transpose()
}

/// Describe a file; `Ok(None)` if no visible trove carries it
///
/// `path` is echoed into the descriptor when given.
pub fn get_file_info(
    conn: &Connection,
    scope: &RoleScope,
    file_id: &str,
    path: Option<&str>,
    urls: &dyn UrlBuilder,
) -> Result<Option<FileDescriptor>> {
    match load_stream(conn, scope, file_id)? {
        Some(file) => FileDescriptor::from_frozen(file_id, path, &file, urls).map(Some),
        None => Ok(None),
    }
}

/// Content hash and config flag; `Ok(None)` for absent files and for
/// files without contents
pub fn get_file_sha1(
    conn: &Connection,
    scope: &RoleScope,
    file_id: &str,
) -> Result<Option<FileContentInfo>> {
    let Some(file) = load_stream(conn, scope, file_id)? else {
        return Ok(None);
    };

    Ok(file.contents().map(|contents| FileContentInfo {
        sha1: hex::encode(&contents.sha1),
        is_config: file.is_config(),
    }))
}
