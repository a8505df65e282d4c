// src/db/troveinfo.rs

//! Trove info records
//!
//! `TroveInfo` rows hold typed metadata about one trove instance, keyed by
//! a numeric tag. Only the handful of tags the presentation layer needs are
//! decoded here; everything else stays opaque.
//!
//! Encodings:
//! - strings are UTF-8
//! - integers are big-endian, 4 bytes (8 for values past `u32::MAX`)
//! - version lists are NUL separated frozen version strings
//! - metadata is a CBOR map

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Trove info tags understood by the query engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TroveInfoTag {
    SourceName,
    BuildTime,
    ClonedFrom,
    Metadata,
    ClonedFromList,
}

impl TroveInfoTag {
    pub fn id(self) -> i64 {
        match self {
            TroveInfoTag::SourceName => 1,
            TroveInfoTag::BuildTime => 2,
            TroveInfoTag::ClonedFrom => 8,
            TroveInfoTag::Metadata => 17,
            TroveInfoTag::ClonedFromList => 26,
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(TroveInfoTag::SourceName),
            2 => Some(TroveInfoTag::BuildTime),
            8 => Some(TroveInfoTag::ClonedFrom),
            17 => Some(TroveInfoTag::Metadata),
            26 => Some(TroveInfoTag::ClonedFromList),
            _ => None,
        }
    }
}

fn decode_string(tag: TroveInfoTag, data: &[u8]) -> Result<String> {
    String::from_utf8(data.to_vec())
        .map_err(|e| Error::CorruptRecord(format!("trove info {tag:?} is not UTF-8: {e}")))
}

fn decode_int(tag: TroveInfoTag, data: &[u8]) -> Result<u64> {
    match data.len() {
        4 => {
            let mut buf = [0u8; 4];
            buf.copy_from_slice(data);
            Ok(u32::from_be_bytes(buf) as u64)
        }
        8 => {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(data);
            Ok(u64::from_be_bytes(buf))
        }
        n => Err(Error::CorruptRecord(format!(
            "trove info {tag:?} has {n} bytes, expected 4 or 8"
        ))),
    }
}

/// Encode an integer trove info value
pub fn encode_int(value: u64) -> Vec<u8> {
    match u32::try_from(value) {
        Ok(small) => small.to_be_bytes().to_vec(),
        Err(_) => value.to_be_bytes().to_vec(),
    }
}

/// Encode a list of frozen versions
pub fn encode_version_list<S: AsRef<str>>(versions: &[S]) -> Vec<u8> {
    versions
        .iter()
        .map(|v| v.as_ref())
        .collect::<Vec<_>>()
        .join("\0")
        .into_bytes()
}

/// Trove metadata blob
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub short_desc: Option<String>,
    #[serde(default)]
    pub long_desc: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub licenses: Vec<String>,
}

impl Metadata {
    pub fn thaw(data: &[u8]) -> Result<Self> {
        ciborium::from_reader(data)
            .map_err(|e| Error::CorruptRecord(format!("trove metadata: {e}")))
    }

    pub fn freeze(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| Error::CorruptRecord(format!("trove metadata: {e}")))?;
        Ok(buf)
    }
}

/// The trove info subset needed to assemble a single trove document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TroveInfoSet {
    pub source_name: Option<String>,
    pub build_time: Option<u64>,
    pub cloned_from: Option<String>,
    pub cloned_from_list: Option<Vec<String>>,
}

impl TroveInfoSet {
    /// Tags to fetch for `from_rows`
    pub const TAGS: [TroveInfoTag; 4] = [
        TroveInfoTag::SourceName,
        TroveInfoTag::ClonedFrom,
        TroveInfoTag::ClonedFromList,
        TroveInfoTag::BuildTime,
    ];

    /// Decode `(infoType, data)` rows; unrequested tags and NULL data are skipped
    pub fn from_rows<I>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = (i64, Option<Vec<u8>>)>,
    {
        let mut set = Self::default();

        for (info_type, data) in rows {
            let (Some(tag), Some(data)) = (TroveInfoTag::from_id(info_type), data) else {
                continue;
            };

            match tag {
                TroveInfoTag::SourceName => set.source_name = Some(decode_string(tag, &data)?),
                TroveInfoTag::BuildTime => set.build_time = Some(decode_int(tag, &data)?),
                TroveInfoTag::ClonedFrom => set.cloned_from = Some(decode_string(tag, &data)?),
                TroveInfoTag::ClonedFromList => {
                    let list = decode_string(tag, &data)?;
                    set.cloned_from_list = Some(
                        list.split('\0')
                            .filter(|v| !v.is_empty())
                            .map(str::to_string)
                            .collect(),
                    );
                }
                TroveInfoTag::Metadata => {}
            }
        }

        Ok(set)
    }

    /// Versions this trove was cloned from, oldest record order preserved
    ///
    /// The list form is authoritative; the legacy single field is only
    /// consulted when no list was recorded.
    pub fn clone_history(&self) -> Vec<String> {
        match (&self.cloned_from_list, &self.cloned_from) {
            (Some(list), _) => list.clone(),
            (None, Some(single)) => vec![single.clone()],
            (None, None) => Vec::new(),
        }
    }
}
