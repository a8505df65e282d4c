// src/label.rs

//! Conary labels
//!
//! A label names the line of development a trove was published on:
//! `host@namespace:tag`, for example `conary.example.com@rpl:2-devel`.
//! The host part is the repository server for every trove on the label,
//! so trove links are rewritten to point at it.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A parsed `host@namespace:tag` label
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label {
    pub repository: String,
    pub namespace: String,
    pub tag: String,
}

/// Which part of a label was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelPart {
    Repository,
    Namespace,
    Tag,
}

impl fmt::Display for LabelPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LabelPart::Repository => "repository",
            LabelPart::Namespace => "namespace",
            LabelPart::Tag => "tag",
        })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LabelParseError {
    #[error("Label '{0}' is not of the form host@namespace:tag")]
    Malformed(String),

    #[error("Empty {part} in label '{label}'")]
    Empty { part: LabelPart, label: String },

    #[error("Invalid character '{found}' in {part} of label '{label}'")]
    InvalidChar {
        part: LabelPart,
        found: char,
        label: String,
    },
}

fn check_part(part: LabelPart, value: &str, label: &str) -> Result<(), LabelParseError> {
    if value.is_empty() {
        return Err(LabelParseError::Empty {
            part,
            label: label.to_string(),
        });
    }
    match value
        .chars()
        .find(|&c| !(c.is_alphanumeric() || matches!(c, '.' | '-' | '_')))
    {
        Some(found) => Err(LabelParseError::InvalidChar {
            part,
            found,
            label: label.to_string(),
        }),
        None => Ok(()),
    }
}

impl Label {
    pub fn parse(s: &str) -> Result<Self, LabelParseError> {
        let (repository, rest) = s
            .split_once('@')
            .ok_or_else(|| LabelParseError::Malformed(s.to_string()))?;
        let (namespace, tag) = rest
            .split_once(':')
            .ok_or_else(|| LabelParseError::Malformed(s.to_string()))?;

        check_part(LabelPart::Repository, repository, s)?;
        check_part(LabelPart::Namespace, namespace, s)?;
        check_part(LabelPart::Tag, tag, s)?;

        Ok(Self {
            repository: repository.to_string(),
            namespace: namespace.to_string(),
            tag: tag.to_string(),
        })
    }

    /// The server that hosts this label
    pub fn host(&self) -> &str {
        &self.repository
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.repository, self.namespace, self.tag)
    }
}

impl FromStr for Label {
    type Err = LabelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Label::parse(s)
    }
}

impl From<LabelParseError> for crate::error::Error {
    fn from(e: LabelParseError) -> Self {
        crate::error::Error::ParseError(e.to_string())
    }
}
