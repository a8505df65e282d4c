// src/query/filter.rs

//! Trove kind filters
//!
//! Kinds are derived purely from the trove name, so filtering happens after
//! rows come back from the database.

use crate::error::{Error, Result};
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Kind of trove a search can be restricted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TroveKind {
    Group,
    Package,
    Component,
    FileSet,
    Collection,
    Source,
    BinaryComponent,
}

impl TroveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TroveKind::Group => "group",
            TroveKind::Package => "package",
            TroveKind::Component => "component",
            TroveKind::FileSet => "fileset",
            TroveKind::Collection => "collection",
            TroveKind::Source => "source",
            TroveKind::BinaryComponent => "binary-component",
        }
    }

    /// Does a trove with this name belong to this kind?
    pub fn matches(&self, name: &str) -> bool {
        match self {
            TroveKind::Group => is_group(name),
            TroveKind::Package => is_package(name),
            TroveKind::Component => is_component(name),
            TroveKind::FileSet => is_fileset(name),
            TroveKind::Collection => is_collection(name),
            TroveKind::Source => is_source_component(name),
            TroveKind::BinaryComponent => is_component(name) && !is_source_component(name),
        }
    }
}

impl fmt::Display for TroveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TroveKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl FromStr for TroveKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "group" => Ok(TroveKind::Group),
            "package" => Ok(TroveKind::Package),
            "component" => Ok(TroveKind::Component),
            "fileset" => Ok(TroveKind::FileSet),
            "collection" => Ok(TroveKind::Collection),
            "source" => Ok(TroveKind::Source),
            "binary-component" | "binarycomponent" => Ok(TroveKind::BinaryComponent),
            _ => Err(Error::InvalidParameter {
                name: "type".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

pub fn is_collection(name: &str) -> bool {
    !name.contains(':')
}

pub fn is_component(name: &str) -> bool {
    name.contains(':')
}

pub fn is_group(name: &str) -> bool {
    is_collection(name) && name.starts_with("group-")
}

pub fn is_fileset(name: &str) -> bool {
    is_collection(name) && name.starts_with("fileset-")
}

pub fn is_package(name: &str) -> bool {
    !is_fileset(name) && !is_group(name) && !is_component(name)
}

pub fn is_source_component(name: &str) -> bool {
    name.ends_with(":source")
}

/// A set of requested kinds; a trove passes if any kind matches, and an
/// empty set lets everything through
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KindFilter {
    kinds: BTreeSet<TroveKind>,
}

impl KindFilter {
    pub fn new(kinds: impl IntoIterator<Item = TroveKind>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
        }
    }

    pub fn insert(&mut self, kind: TroveKind) {
        self.kinds.insert(kind);
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn kinds(&self) -> impl Iterator<Item = TroveKind> + '_ {
        self.kinds.iter().copied()
    }

    pub fn admits(&self, name: &str) -> bool {
        self.kinds.is_empty() || self.kinds.iter().any(|k| k.matches(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_predicates() {
        assert!(TroveKind::Group.matches("group-dist"));
        assert!(!TroveKind::Group.matches("group-dist:source"));
        assert!(TroveKind::Package.matches("nginx"));
        assert!(!TroveKind::Package.matches("group-dist"));
        assert!(!TroveKind::Package.matches("fileset-etc"));
        assert!(TroveKind::FileSet.matches("fileset-etc"));
        assert!(TroveKind::Component.matches("nginx:runtime"));
        assert!(TroveKind::Collection.matches("nginx"));
        assert!(TroveKind::Collection.matches("group-dist"));
        assert!(TroveKind::Source.matches("nginx:source"));
        assert!(TroveKind::BinaryComponent.matches("nginx:runtime"));
        assert!(!TroveKind::BinaryComponent.matches("nginx:source"));
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!("binary-component".parse::<TroveKind>().unwrap(), TroveKind::BinaryComponent);
        assert_eq!("binarycomponent".parse::<TroveKind>().unwrap(), TroveKind::BinaryComponent);
        assert_eq!("fileset".parse::<TroveKind>().unwrap(), TroveKind::FileSet);
        assert!("redirect".parse::<TroveKind>().is_err());
    }

    #[test]
    fn test_empty_filter_admits_all() {
        let filter = KindFilter::default();
        assert!(filter.admits("nginx"));
        assert!(filter.admits("nginx:source"));
    }

    #[test]
    fn test_filter_is_a_union() {
        let filter = KindFilter::new([TroveKind::Group, TroveKind::Source]);
        assert!(filter.admits("group-dist"));
        assert!(filter.admits("nginx:source"));
        assert!(!filter.admits("nginx"));
        assert!(!filter.admits("nginx:runtime"));
    }
}
