// src/content/mod.rs

//! Content delivery
//!
//! File contents live in the repository's content store, addressed by the
//! hex SHA-1 of the uncompressed data and stored gzip compressed. Regular
//! file content is handed to the transport as a path plus headers, since
//! the stored bytes are already in the wire encoding.
//!
//! Build logs are stored bzip2 compressed inside the gzip layer. They are
//! decoded on the fly and recompressed with plain gzip in bounded chunks by
//! [`CompressedChunks`].

use crate::error::Result;
use crate::model::FileContentInfo;
use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default read size for the chunk producer
pub const DEFAULT_CHUNK_SIZE: usize = 32 * 1024;

/// Content type for downloads
pub const OCTET_STREAM: &str = "application/octet-stream";
/// Content type for config files shown inline
pub const TEXT_PLAIN: &str = "text/plain";
/// Stored and streamed content is always gzip encoded
pub const GZIP_ENCODING: &str = "gzip";

/// Read side of the repository content store
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a blob in the store
    ///
    /// Layout: {root}/{first2}/{remaining}, e.g. `ab/c123...`
    pub fn hash_to_path(&self, sha1: &str) -> PathBuf {
        if sha1.len() < 2 {
            return self.root.join(sha1);
        }

        let (prefix, suffix) = sha1.split_at(2);
        self.root.join(prefix).join(suffix)
    }

    pub fn open(&self, sha1: &str) -> Result<File> {
        let path = self.hash_to_path(sha1);
        debug!("Opening content {} at {}", sha1, path.display());
        Ok(File::open(path)?)
    }
}

/// How the transport should present the bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Force a download, optionally suggesting a file name
    Attachment { filename: String },
    /// Show in the browser
    Inline,
}

/// A stored, already compressed blob ready to be sent as is
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    pub path: PathBuf,
    pub disposition: Disposition,
    pub content_type: &'static str,
    pub content_encoding: &'static str,
}

/// Delivery plan for a file's content
///
/// Config files are offered inline as plain text; everything else is a
/// download named after the last segment of `request_path`, or the content
/// hash when no path was given.
pub fn file_content(
    store: &ContentStore,
    info: &FileContentInfo,
    request_path: Option<&str>,
) -> FileContent {
    let path = store.hash_to_path(&info.sha1);

    if info.is_config {
        return FileContent {
            path,
            disposition: Disposition::Inline,
            content_type: TEXT_PLAIN,
            content_encoding: GZIP_ENCODING,
        };
    }

    let filename = request_path
        .and_then(|p| Path::new(p).file_name())
        .and_then(|n| n.to_str())
        .unwrap_or(&info.sha1)
        .to_string();

    FileContent {
        path,
        disposition: Disposition::Attachment { filename },
        content_type: OCTET_STREAM,
        content_encoding: GZIP_ENCODING,
    }
}

/// Decoded log file, recompressed into gzip chunks
pub type LogChunks = CompressedChunks<BzDecoder<GzDecoder<File>>>;

/// Open a stored build log for streaming
pub fn log_content(store: &ContentStore, info: &FileContentInfo, chunk_size: usize) -> Result<LogChunks> {
    let file = store.open(&info.sha1)?;
    let decoded = BzDecoder::new(GzDecoder::new(file));
    Ok(CompressedChunks::with_chunk_size(decoded, chunk_size))
}

/// Lazily gzip-compresses a reader, yielding compressed chunks
///
/// Each step reads at most one chunk from the source. Steps that produce
/// no compressed output yet read again instead of yielding an empty chunk;
/// the gzip trailer is the last item. Dropping the iterator early releases
/// the reader.
pub struct CompressedChunks<R> {
    reader: R,
    encoder: Option<GzEncoder<Vec<u8>>>,
    buf: Vec<u8>,
}

impl<R: Read> CompressedChunks<R> {
    pub fn new(reader: R) -> Self {
        Self::with_chunk_size(reader, DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            encoder: Some(GzEncoder::new(Vec::new(), Compression::default())),
            buf: vec![0; chunk_size.max(1)],
        }
    }
}

impl<R: Read> Iterator for CompressedChunks<R> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let encoder = self.encoder.as_mut()?;

            let n = match self.reader.read(&mut self.buf) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.encoder = None;
                    return Some(Err(e));
                }
            };

            if n == 0 {
                return self.encoder.take().map(|encoder| encoder.finish());
            }

            if let Err(e) = encoder.write_all(&self.buf[..n]) {
                self.encoder = None;
                return Some(Err(e));
            }

            let pending = encoder.get_mut();
            if !pending.is_empty() {
                return Some(Ok(std::mem::take(pending)));
            }
        }
    }
}
