// src/lib.rs

//! crest: read-only query layer for Conary repositories
//!
//! Resolves trove and file identities out of a Conary repository database
//! and assembles them into typed, linkable documents.
//!
//! # Architecture
//!
//! - Role scoped: every query runs under a non-empty set of roles
//! - Read-only: one read-only connection per request, nothing is cached
//! - Troves: identified by name, version and flavor
//! - Flavors: compared only in their frozen, canonical form
//! - Files: addressed by content id, dispatched once by their kind tag
//! - Documents: closed serde structs, lowerable into a schema-checked
//!   element tree for other serializers

pub mod config;
pub mod content;
pub mod db;
mod error;
pub mod flavor;
pub mod label;
pub mod model;
pub mod query;
pub mod scope;
pub mod url;
pub mod version;

pub use error::{Error, Result};
pub use flavor::{ArchSpec, FlavorItem, FlavorOp, FlavorSpec};
pub use label::{Label, LabelParseError};
pub use model::{
    FileDescriptor, FileKind, LabelList, Node, NodeList, Repository, Resource, SingleTrove,
    TroveCollection, TroveIdent, TroveList, TroveSpec,
};
pub use query::{KindFilter, Session, TroveKind, TroveQuery};
pub use scope::RoleScope;
pub use url::{BaseUrl, LinkTarget, ResourceKind, UrlBuilder};
pub use version::{VersionInfo, VersionString};
