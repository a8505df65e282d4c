// src/model/mod.rs

//! Resource model
//!
//! Typed documents produced by the resolvers. Every document is a closed
//! struct that serializes with serde, and can also be lowered into an
//! abstract [`Element`] tree for serializers that want a generic shape
//! (XML and the like).
//!
//! Links are never stored as format strings. Identities get their id from
//! a [`UrlBuilder`] when they are assembled, and relations such as a node's
//! full version list are kept as keys and turned into links when rendered.
//!
//! ```text
//! Repository
//!   └── RepositoryLabel ── links ──> TroveList, NodeList
//! NodeList
//!   └── Node ── NodeKey ──> TroveList (all versions)
//! TroveCollection
//!   └── SingleTrove
//!         ├── source: TroveIdent
//!         ├── clonedFrom: [TroveIdent]
//!         ├── file: [FileInTrove] ──> FileDescriptor
//!         └── trove: [TroveIdent]
//! ```

pub mod element;
pub mod file;
pub mod node;
pub mod repository;
pub mod trove;

pub use element::{Element, ElementBuilder, Schema, Value};
pub use file::{FileContentInfo, FileDescriptor, FileKind, InodeInfo};
pub use node::{Node, NodeKey, NodeList};
pub use repository::{NodeListLink, Repository, RepositoryLabel};
pub use trove::{
    FileInTrove, LabelList, SingleTrove, TroveCollection, TroveIdent, TroveList, TroveSpec,
};

use crate::error::Result;
use crate::url::UrlBuilder;

/// A document that can be lowered into an element tree
pub trait Resource {
    /// Declared shape of this document's element
    fn schema(&self) -> &'static Schema;

    /// Build the element tree; fails if a field outside the schema is set
    fn to_element(&self, urls: &dyn UrlBuilder) -> Result<Element>;
}
