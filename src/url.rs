// src/url.rs

//! Hypermedia link construction
//!
//! Documents never format URLs themselves; they ask a [`UrlBuilder`] for
//! the canonical link of a resource. The transport layer owns the real
//! builder (it knows the request's scheme and mount point); [`BaseUrl`] is
//! the stock implementation used by the CLI and tests.

use crate::error::{Error, Result};
use tracing::warn;
use url::Url;

/// Kinds of resources that can be linked to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Repository,
    Node,
    Trove,
    Troves,
    File,
    LogFile,
}

impl ResourceKind {
    /// Path segment for this resource kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Repository => "",
            ResourceKind::Node => "node",
            ResourceKind::Trove => "trove",
            ResourceKind::Troves => "troves",
            ResourceKind::File => "file",
            ResourceKind::LogFile => "logfile",
        }
    }
}

/// A request for one link
#[derive(Debug, Clone, Default)]
pub struct LinkTarget<'a> {
    /// Resource key such as `name=version[flavor]` or a file id; empty for
    /// collections
    pub key: &'a str,
    /// Sub-resource such as `info` or `content`
    pub sub: Option<&'a str>,
    /// Host to point the link at, when it differs from the serving host
    pub host: Option<&'a str>,
    /// Query parameters, in order
    pub query: Vec<(&'a str, &'a str)>,
}

impl<'a> LinkTarget<'a> {
    pub fn key(key: &'a str) -> Self {
        Self {
            key,
            ..Default::default()
        }
    }

    pub fn collection() -> Self {
        Self::default()
    }

    pub fn sub(mut self, sub: &'a str) -> Self {
        self.sub = Some(sub);
        self
    }

    pub fn host(mut self, host: &'a str) -> Self {
        self.host = Some(host);
        self
    }

    pub fn param(mut self, name: &'a str, value: &'a str) -> Self {
        self.query.push((name, value));
        self
    }
}

/// Turns (resource kind, key, host, query) into a canonical link
pub trait UrlBuilder {
    fn make_url(&self, kind: ResourceKind, target: &LinkTarget<'_>) -> String;
}

/// Links rooted at a fixed base URL
#[derive(Debug, Clone)]
pub struct BaseUrl {
    base: Url,
}

impl BaseUrl {
    /// Parse a base URL such as `http://localhost:9000/api/`
    pub fn parse(base: &str) -> Result<Self> {
        let mut base = Url::parse(base).map_err(|e| Error::InvalidParameter {
            name: "base_url".to_string(),
            value: format!("{base}: {e}"),
        })?;
        if base.cannot_be_a_base() {
            return Err(Error::InvalidParameter {
                name: "base_url".to_string(),
                value: base.to_string(),
            });
        }
        // Ensure joins append to the base path instead of replacing its last segment
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { base })
    }
}

impl UrlBuilder for BaseUrl {
    fn make_url(&self, kind: ResourceKind, target: &LinkTarget<'_>) -> String {
        let mut path = kind.as_str().to_string();
        if !target.key.is_empty() {
            path.push('/');
            path.push_str(&urlencoding::encode(target.key));
        }
        if let Some(sub) = target.sub {
            path.push('/');
            path.push_str(sub);
        }

        let mut url = self.base.clone();
        url.set_path(&format!("{}{}", self.base.path(), path));

        if let Some(host) = target.host {
            if let Err(e) = url.set_host(Some(host)) {
                warn!("Cannot link to host '{}' ({}), using {}", host, e, self.base);
            }
        }

        if !target.query.is_empty() {
            url.query_pairs_mut().extend_pairs(target.query.iter().copied());
        }

        url.to_string()
    }
}
