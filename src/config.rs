// src/config.rs
//! Configuration file parsing for crest
//!
//! Supports TOML configuration files with the following sections:
//! - [database] - Repository database path and default roles
//! - [content] - Content store root and log streaming chunk size
//! - [urls] - Base URL links are rooted at

use crate::content::{ContentStore, DEFAULT_CHUNK_SIZE};
use crate::url::BaseUrl;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize)]
pub struct CrestConfig {
    #[serde(default)]
    pub database: DatabaseSection,

    #[serde(default)]
    pub content: ContentSection,

    #[serde(default)]
    pub urls: UrlsSection,
}

/// Repository database settings
#[derive(Debug, Deserialize)]
pub struct DatabaseSection {
    /// Path to the repository database
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    /// Roles used when none are given on the command line
    #[serde(default)]
    pub roles: Vec<i64>,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            roles: Vec::new(),
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("/srv/conary/sqldb")
}

/// Content store settings
#[derive(Debug, Deserialize)]
pub struct ContentSection {
    /// Root of the content store
    #[serde(default = "default_content_root")]
    pub root: PathBuf,

    /// Read size when recompressing log files
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for ContentSection {
    fn default() -> Self {
        Self {
            root: default_content_root(),
            chunk_size: default_chunk_size(),
        }
    }
}

fn default_content_root() -> PathBuf {
    PathBuf::from("/srv/conary/contents")
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

/// Link settings
#[derive(Debug, Deserialize)]
pub struct UrlsSection {
    #[serde(default = "default_base_url")]
    pub base: String,
}

impl Default for UrlsSection {
    fn default() -> Self {
        Self {
            base: default_base_url(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000/api/".to_string()
}

impl CrestConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: CrestConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.content.chunk_size == 0 {
            anyhow::bail!("content.chunk_size must be greater than zero");
        }

        self.url_builder()?;
        Ok(())
    }

    pub fn url_builder(&self) -> Result<BaseUrl> {
        BaseUrl::parse(&self.urls.base)
            .with_context(|| format!("Invalid urls.base: {}", self.urls.base))
    }

    pub fn content_store(&self) -> ContentStore {
        ContentStore::new(&self.content.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = CrestConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.database.path, PathBuf::from("/srv/conary/sqldb"));
        assert!(config.database.roles.is_empty());
        assert_eq!(config.content.chunk_size, 32 * 1024);
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
[database]
path = "/var/lib/repo/sqldb"
roles = [1, 2]

[urls]
base = "https://repo.example.com/conary/api"
"#;
        let config: CrestConfig = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.database.path, PathBuf::from("/var/lib/repo/sqldb"));
        assert_eq!(config.database.roles, vec![1, 2]);
        assert_eq!(config.content.root, PathBuf::from("/srv/conary/contents"));
        assert_eq!(config.urls.base, "https://repo.example.com/conary/api");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[content]\nchunk_size = 4096").unwrap();

        let config = CrestConfig::load(file.path()).unwrap();
        assert_eq!(config.content.chunk_size, 4096);
    }

    #[test]
    fn test_invalid_values() {
        let config: CrestConfig = toml::from_str("[content]\nchunk_size = 0").unwrap();
        assert!(config.validate().is_err());

        let config: CrestConfig = toml::from_str("[urls]\nbase = \"nope\"").unwrap();
        assert!(config.validate().is_err());
    }
}
