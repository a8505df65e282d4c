// src/error.rs

//! Error types for the query engine
//!
//! "Not found" is never an error here: resolvers return `Ok(None)` for an
//! absent trove or file. Everything in this enum is either a rejected
//! request, a construction contract violation, or a sign that the
//! repository database does not look the way the resolvers expect.

use thiserror::Error;

/// Errors produced by the query engine
#[derive(Error, Debug)]
pub enum Error {
    /// The caller's role scope is empty
    #[error("Forbidden: no roles authorized for this request")]
    Forbidden,

    /// A resource element was given a field outside its declared set
    #[error("Unknown field '{field}' for resource '{resource}'")]
    UnknownField {
        resource: &'static str,
        field: String,
    },

    /// A frozen file stream carries a kind tag this engine does not know
    #[error("Unsupported file kind tag '{0}' in repository record")]
    UnknownFileKind(char),

    /// Trove instance exists but has no build time recorded
    #[error("Trove {0} has no build time")]
    MissingBuildTime(String),

    /// A stored record could not be decoded
    #[error("Corrupt repository record: {0}")]
    CorruptRecord(String),

    /// Malformed `name=version[flavor]` key
    #[error("Invalid trove specification: {0}")]
    InvalidTroveSpec(String),

    /// Malformed file id
    #[error("Invalid file id: {0}")]
    InvalidFileId(String),

    /// Malformed query parameter
    #[error("Invalid parameter '{name}': {value}")]
    InvalidParameter { name: String, value: String },

    /// Flavor, version or label parse failure
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for errors that indicate repository corruption or a schema
    /// mismatch rather than a bad request
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Error::UnknownFileKind(_) | Error::MissingBuildTime(_) | Error::CorruptRecord(_)
        )
    }
}

/// Result type for query engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Reclassify parse failures of values read back from the store
///
/// A version, flavor or branch that came out of the database and does not
/// parse is a corrupt record, not a bad request.
pub(crate) trait StoredValue<T> {
    fn stored(self, what: &str) -> Result<T>;
}

impl<T> StoredValue<T> for Result<T> {
    fn stored(self, what: &str) -> Result<T> {
        self.map_err(|e| match e {
            Error::ParseError(msg) => Error::CorruptRecord(format!("stored {what}: {msg}")),
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_parse_failure_is_corrupt() {
        let parsed: Result<()> = Err(Error::ParseError("bad".to_string()));
        let err = parsed.stored("flavor").unwrap_err();
        assert!(matches!(err, Error::CorruptRecord(ref m) if m == "stored flavor: bad"));
        assert!(err.is_invariant_violation());

        let forbidden: Result<()> = Err(Error::Forbidden);
        assert!(matches!(forbidden.stored("flavor"), Err(Error::Forbidden)));
    }
}
