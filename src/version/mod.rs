// src/version/mod.rs

//! Conary version strings
//!
//! A version is a branch path followed by a trailing revision:
//!
//! ```text
//! /conary.example.com@rpl:2/1.0-1-2
//!  '---- branch -------'   '----- revision (upstream-source-build)
//! ```
//!
//! Branched versions alternate labels and revisions
//! (`/a@rpl:2/1.0-1/b@rpl:fix/1.0-1.1-1`); only the last label, the
//! trailing label, matters for link hosts and label listings.
//!
//! Revisions read out of trove info may carry a frozen timestamp
//! (`1234567890.123:1.0-1-2`). The timestamp is what orders versions on a
//! branch. Zero is a legitimate timestamp, so it is kept as `Some(0.0)`;
//! `None` only ever means the ordering was not resolved.

use crate::error::{Error, Result};
use crate::label::Label;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// A trailing revision: `upstream-sourceCount[-buildCount]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    pub upstream: String,
    pub source_count: String,
    pub build_count: Option<String>,
}

impl Revision {
    /// Parse a revision like `1.0-1-2` (binary) or `1.0-1` (source)
    pub fn parse(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('-').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(Error::ParseError(format!("Empty component in revision '{s}'")));
        }

        match parts.as_slice() {
            [upstream, source] => Ok(Self {
                upstream: upstream.to_string(),
                source_count: source.to_string(),
                build_count: None,
            }),
            [upstream, source, build] => Ok(Self {
                upstream: upstream.to_string(),
                source_count: source.to_string(),
                build_count: Some(build.to_string()),
            }),
            _ => Err(Error::ParseError(format!("Malformed revision '{s}'"))),
        }
    }

    /// The revision of the source trove this revision was built from
    pub fn source_revision(&self) -> Self {
        Self {
            upstream: self.upstream.clone(),
            source_count: self.source_count.clone(),
            build_count: None,
        }
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.upstream, self.source_count)?;
        if let Some(ref build) = self.build_count {
            write!(f, "-{build}")?;
        }
        Ok(())
    }
}

/// A parsed version string
#[derive(Debug, Clone, PartialEq)]
pub struct VersionString {
    branch: String,
    trailing_label: Label,
    revision: Revision,
    timestamp: Option<f64>,
}

impl VersionString {
    /// Parse a version string, plain or with frozen timestamps
    pub fn parse(s: &str) -> Result<Self> {
        if !s.starts_with('/') {
            return Err(Error::ParseError(format!(
                "Version '{s}' does not start with '/'"
            )));
        }

        let (branch, trailing) = s
            .rsplit_once('/')
            .ok_or_else(|| Error::ParseError(format!("Version '{s}' has no revision")))?;
        if branch.is_empty() {
            return Err(Error::ParseError(format!("Version '{s}' has no branch")));
        }

        let (timestamp, revision) = split_timestamp(trailing)?;
        let revision = Revision::parse(revision)?;
        let branch = strip_timestamps(branch)?;
        let trailing_label = branch_label(&branch)?;

        Ok(Self {
            branch,
            trailing_label,
            revision,
            timestamp,
        })
    }

    /// The branch path without timestamps
    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn trailing_label(&self) -> &Label {
        &self.trailing_label
    }

    /// Host serving the trailing label
    pub fn host(&self) -> &str {
        self.trailing_label.host()
    }

    pub fn revision(&self) -> &Revision {
        &self.revision
    }

    /// Frozen timestamp of the trailing revision, if the string carried one
    pub fn timestamp(&self) -> Option<f64> {
        self.timestamp
    }

    /// The version of the source trove this version was built from
    ///
    /// Same branch, build count dropped.
    pub fn source_version(&self) -> String {
        format!("{}/{}", self.branch, self.revision.source_revision())
    }
}

impl fmt::Display for VersionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.branch, self.revision)
    }
}

impl FromStr for VersionString {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        VersionString::parse(s)
    }
}

fn split_timestamp(segment: &str) -> Result<(Option<f64>, &str)> {
    match segment.split_once(':') {
        Some((ts, rest)) => {
            let ts = ts.parse::<f64>().map_err(|e| {
                Error::ParseError(format!("Invalid timestamp in revision '{segment}': {e}"))
            })?;
            Ok((Some(ts), rest))
        }
        None => Ok((None, segment)),
    }
}

/// Drop frozen timestamps from the revisions inside a branch path
fn strip_timestamps(branch: &str) -> Result<String> {
    let segments = branch
        .split('/')
        .map(|seg| {
            if seg.contains('@') {
                Ok(seg)
            } else {
                split_timestamp(seg).map(|(_, rev)| rev)
            }
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(segments.join("/"))
}

/// The trailing label of a branch path like `/a@rpl:2` or `/a@rpl:2//b@x:y`
pub fn branch_label(branch: &str) -> Result<Label> {
    let last = branch
        .rsplit('/')
        .find(|seg| !seg.is_empty())
        .ok_or_else(|| Error::ParseError(format!("Branch '{branch}' has no label")))?;
    Ok(Label::parse(last)?)
}

/// Version data attached to trove identities in documents
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionInfo {
    /// Full version string without timestamps
    pub full: String,
    /// Trailing label
    pub label: String,
    /// Trailing revision
    pub revision: String,
    /// Timestamp of the trailing revision; `None` when unresolved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ordering: Option<f64>,
}

impl VersionInfo {
    /// Version info with an ordering resolved from the store
    pub fn resolved(version: &str, ordering: f64) -> Result<Self> {
        let parsed = VersionString::parse(version)?;
        Ok(Self::from_version(&parsed, Some(ordering)))
    }

    /// Version info using whatever timestamp the string itself carries
    pub fn parse(version: &str) -> Result<Self> {
        let parsed = VersionString::parse(version)?;
        let ordering = parsed.timestamp();
        Ok(Self::from_version(&parsed, ordering))
    }

    pub fn from_version(version: &VersionString, ordering: Option<f64>) -> Self {
        Self {
            full: version.to_string(),
            label: version.trailing_label().to_string(),
            revision: version.revision().to_string(),
            ordering,
        }
    }

    /// Host serving this version's trailing label
    pub fn host(&self) -> &str {
        // label was produced from a parsed Label, so '@' is present
        self.label.split('@').next().unwrap_or_default()
    }
}
