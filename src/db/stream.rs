// src/db/stream.rs

//! Frozen file streams
//!
//! Every file record in `FileStreams.stream` is a CBOR-encoded snapshot of
//! the file's inode, tagged with the `ls -l` style kind character the file
//! had when it was committed (`-`, `d`, `l`, `b`, `c`, `s`, `p`). The tag is
//! kept raw here; interpreting it is the file resolver's job.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Config file flag bit
pub const FILE_FLAG_CONFIG: u32 = 1 << 0;

/// Inode attributes shared by every file kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InodeStream {
    pub owner: String,
    pub group: String,
    pub mtime: u64,
    pub perms: u32,
}

/// Content description for regular files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentsStream {
    pub size: u64,
    /// 20 byte SHA-1 of the uncompressed contents
    pub sha1: Vec<u8>,
}

/// Device numbers for block and character devices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStream {
    pub major: u32,
    pub minor: u32,
}

/// A frozen file record as stored in the repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrozenFile {
    pub tag: char,
    pub inode: InodeStream,
    #[serde(default)]
    pub flags: u32,
    #[serde(default)]
    pub contents: Option<ContentsStream>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub devt: Option<DeviceStream>,
}

impl FrozenFile {
    /// Decode a stream blob
    pub fn thaw(stream: &[u8]) -> Result<Self> {
        ciborium::from_reader(stream)
            .map_err(|e| Error::CorruptRecord(format!("file stream: {e}")))
    }

    /// Encode into a stream blob
    pub fn freeze(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| Error::CorruptRecord(format!("file stream: {e}")))?;
        Ok(buf)
    }

    pub fn is_config(&self) -> bool {
        self.flags & FILE_FLAG_CONFIG != 0
    }

    /// Contents description, present only for files that carry content
    pub fn contents(&self) -> Option<&ContentsStream> {
        self.contents.as_ref()
    }
}
