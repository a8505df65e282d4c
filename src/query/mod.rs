// src/query/mod.rs

//! Query engine
//!
//! Resolvers are plain functions over a `&Connection` and a `&RoleScope`.
//! [`Session`] bundles one read-only connection, the validated scope and a
//! URL builder for a single request, and releases the connection when it
//! is dropped.

pub mod file;
pub mod filter;
pub mod identity;
pub mod trove;

pub use filter::{KindFilter, TroveKind};

use crate::db;
use crate::error::{Error, Result, StoredValue};
use crate::flavor::FlavorSpec;
use crate::model::{
    FileContentInfo, FileDescriptor, LabelList, NodeList, Repository, SingleTrove,
    TroveCollection, TroveIdent, TroveList, TroveSpec,
};
use crate::scope::RoleScope;
use crate::url::UrlBuilder;
use crate::version::VersionInfo;
use rusqlite::types::Value;
use rusqlite::Connection;
use std::path::Path;
use tracing::{debug, info};

/// Parameters of a trove search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TroveQuery {
    /// Exact label match
    pub label: Option<String>,
    /// Exact trove name match
    pub name: Option<String>,
    pub types: KindFilter,
    /// Newest version per branch only
    pub latest: bool,
    pub start: usize,
    pub limit: Option<usize>,
}

impl Default for TroveQuery {
    fn default() -> Self {
        Self {
            label: None,
            name: None,
            types: KindFilter::default(),
            latest: true,
            start: 0,
            limit: None,
        }
    }
}

impl TroveQuery {
    /// Build a query from request parameters
    ///
    /// Recognizes `label`, `name`, `type` (repeatable), `latest` (anything
    /// but `0` means true), `start` and `limit`. Other parameters are
    /// ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut query = Self::default();

        for (key, value) in pairs {
            let (key, value) = (key.as_ref(), value.as_ref());
            match key {
                "label" => query.label = Some(value.to_string()),
                "name" => query.name = Some(value.to_string()),
                "type" => query.types.insert(value.parse()?),
                "latest" => query.latest = value != "0",
                "start" => query.start = parse_count(key, value)?,
                "limit" => query.limit = Some(parse_count(key, value)?),
                other => debug!("Ignoring unknown query parameter '{}'", other),
            }
        }

        Ok(query)
    }
}

fn parse_count(name: &str, value: &str) -> Result<usize> {
    value.parse().map_err(|_| Error::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
    })
}

/// `= ?` with the label bound, or a check that matches every label
pub(crate) fn label_clause(label: Option<&str>) -> (&'static str, Vec<Value>) {
    match label {
        Some(label) => ("= ?", vec![Value::Text(label.to_string())]),
        None => ("IS NOT NULL", Vec::new()),
    }
}

/// Build an identity from a stored (name, version, frozen flavor) row
pub(crate) fn ident_from_row(
    name: impl Into<String>,
    version: &str,
    frozen_flavor: &str,
    ordering: Option<f64>,
    urls: Option<&dyn UrlBuilder>,
) -> Result<TroveIdent> {
    let version = match ordering {
        Some(ordering) => VersionInfo::resolved(version, ordering),
        None => VersionInfo::parse(version),
    }
    .stored("version")?;
    let flavor = FlavorSpec::thaw(frozen_flavor).stored("flavor")?.body();
    Ok(TroveIdent::new(name, version, flavor, urls))
}

/// One request's view of the repository
pub struct Session<'a> {
    conn: Connection,
    scope: RoleScope,
    urls: &'a dyn UrlBuilder,
}

impl<'a> Session<'a> {
    /// Validate the role scope, then open the database read-only
    ///
    /// An empty role set fails with `Error::Forbidden` before the database
    /// is touched.
    pub fn open(
        db_path: impl AsRef<Path>,
        roles: impl IntoIterator<Item = i64>,
        urls: &'a dyn UrlBuilder,
    ) -> Result<Self> {
        let scope = RoleScope::new(roles)?;
        let conn = db::open(db_path)?;
        info!("Opened query session for {} role(s)", scope.len());
        Ok(Self { conn, scope, urls })
    }

    /// Wrap an already open connection
    pub fn with_connection(conn: Connection, scope: RoleScope, urls: &'a dyn UrlBuilder) -> Self {
        Self { conn, scope, urls }
    }

    pub fn scope(&self) -> &RoleScope {
        &self.scope
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn search_troves(&self, query: &TroveQuery) -> Result<TroveList> {
        identity::search_troves(&self.conn, &self.scope, query, Some(self.urls))
    }

    pub fn list_labels(&self) -> Result<LabelList> {
        identity::list_labels(&self.conn, &self.scope)
    }

    pub fn search_nodes(&self, label: Option<&str>, types: &KindFilter) -> Result<NodeList> {
        identity::search_nodes(&self.conn, &self.scope, label, types, Some(self.urls))
    }

    pub fn get_repository(&self) -> Result<Repository> {
        identity::get_repository(&self.conn, &self.scope, self.urls)
    }

    pub fn get_trove(&self, name: &str, version: &str, flavor: &str) -> Result<Option<SingleTrove>> {
        trove::get_trove(&self.conn, &self.scope, name, version, flavor, Some(self.urls))
    }

    /// Resolve a `name=version[flavor]` key
    pub fn get_trove_by_spec(&self, spec: &str) -> Result<Option<SingleTrove>> {
        let spec = TroveSpec::parse(spec)?;
        self.get_trove(&spec.name, &spec.version, &spec.flavor)
    }

    pub fn get_troves(&self, name: &str, version: &str) -> Result<Option<TroveCollection>> {
        trove::get_troves(&self.conn, &self.scope, name, version, Some(self.urls))
    }

    pub fn get_file_info(&self, file_id: &str, path: Option<&str>) -> Result<Option<FileDescriptor>> {
        file::get_file_info(&self.conn, &self.scope, file_id, path, self.urls)
    }

    pub fn get_file_sha1(&self, file_id: &str) -> Result<Option<FileContentInfo>> {
        file::get_file_sha1(&self.conn, &self.scope, file_id)
    }
}
