// src/main.rs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use crest::config::CrestConfig;
use crest::content::{self, Disposition};
use crest::model::Resource;
use crest::query::{KindFilter, Session, TroveKind, TroveQuery};
use crest::url::UrlBuilder;
use serde::Serialize;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;

/// How documents are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// The typed document as JSON
    Json,
    /// The abstract element tree as JSON
    Tree,
}

#[derive(Parser)]
#[command(name = "crest")]
#[command(author, version, about = "Browse a Conary repository database", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Repository database path (overrides the config file)
    #[arg(short, long, global = true)]
    db_path: Option<PathBuf>,

    /// Role id to query as; repeat for several roles
    #[arg(short, long = "role", global = true)]
    roles: Vec<i64>,

    /// Base URL links are rooted at (overrides the config file)
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[arg(long, global = true, value_enum, default_value = "json")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List labels with visible troves
    Labels,
    /// Search troves
    Troves {
        /// Exact label
        #[arg(short, long)]
        label: Option<String>,
        /// Exact trove name
        #[arg(short, long)]
        name: Option<String>,
        /// Trove kind filter; repeat for several
        #[arg(short = 't', long = "type")]
        types: Vec<String>,
        /// Include every version, not just the newest per branch
        #[arg(long)]
        all: bool,
        #[arg(long, default_value_t = 0)]
        start: usize,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show one trove (name=version[flavor])
    Trove { spec: String },
    /// Show every flavor of a trove version (name=version)
    TrovesOf { spec: String },
    /// List nodes of a label
    Nodes {
        #[arg(short, long)]
        label: Option<String>,
        #[arg(short = 't', long = "type")]
        types: Vec<String>,
    },
    /// Show the repository root
    Repository,
    /// Describe a file by content id
    FileInfo {
        file_id: String,
        /// Path to echo into the descriptor
        #[arg(long)]
        path: Option<String>,
    },
    /// Show how a file's content would be delivered
    Content {
        file_id: String,
        /// Requested path, used for the download name
        #[arg(long)]
        path: Option<String>,
    },
    /// Stream a build log as gzip
    Logfile {
        file_id: String,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn emit<T>(doc: &T, format: OutputFormat, urls: &dyn UrlBuilder) -> Result<()>
where
    T: Serialize + Resource,
{
    let json = match format {
        OutputFormat::Json => serde_json::to_string_pretty(doc)?,
        OutputFormat::Tree => serde_json::to_string_pretty(&doc.to_element(urls)?)?,
    };
    println!("{json}");
    Ok(())
}

fn parse_kinds(types: &[String]) -> Result<KindFilter> {
    let kinds = types
        .iter()
        .map(|t| t.parse::<TroveKind>())
        .collect::<crest::Result<Vec<_>>>()?;
    Ok(KindFilter::new(kinds))
}

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => {
            info!("Loading configuration from {}", path.display());
            CrestConfig::load(path)?
        }
        None => CrestConfig::default(),
    };
    if let Some(db_path) = cli.db_path {
        config.database.path = db_path;
    }
    if let Some(base_url) = cli.base_url {
        config.urls.base = base_url;
    }
    let roles = if cli.roles.is_empty() {
        config.database.roles.clone()
    } else {
        cli.roles
    };

    let urls = config.url_builder()?;
    let session = Session::open(&config.database.path, roles, &urls).with_context(|| {
        format!(
            "Failed to open repository at {}",
            config.database.path.display()
        )
    })?;

    match cli.command {
        Commands::Labels => emit(&session.list_labels()?, cli.format, &urls),
        Commands::Troves {
            label,
            name,
            types,
            all,
            start,
            limit,
        } => {
            let mut pairs: Vec<(&str, String)> = Vec::new();
            if let Some(label) = label {
                pairs.push(("label", label));
            }
            if let Some(name) = name {
                pairs.push(("name", name));
            }
            pairs.extend(types.into_iter().map(|t| ("type", t)));
            if all {
                pairs.push(("latest", "0".to_string()));
            }
            pairs.push(("start", start.to_string()));
            if let Some(limit) = limit {
                pairs.push(("limit", limit.to_string()));
            }

            let query = TroveQuery::from_pairs(pairs)?;
            emit(&session.search_troves(&query)?, cli.format, &urls)
        }
        Commands::Trove { spec } => {
            let trove = session
                .get_trove_by_spec(&spec)?
                .with_context(|| format!("Trove not found: {spec}"))?;
            emit(&trove, cli.format, &urls)
        }
        Commands::TrovesOf { spec } => {
            let (name, version) = spec
                .split_once('=')
                .with_context(|| format!("Expected name=version, got '{spec}'"))?;
            let troves = session
                .get_troves(name, version)?
                .with_context(|| format!("Trove not found: {spec}"))?;
            emit(&troves, cli.format, &urls)
        }
        Commands::Nodes { label, types } => {
            let kinds = parse_kinds(&types)?;
            emit(&session.search_nodes(label.as_deref(), &kinds)?, cli.format, &urls)
        }
        Commands::Repository => emit(&session.get_repository()?, cli.format, &urls),
        Commands::FileInfo { file_id, path } => {
            let file = session
                .get_file_info(&file_id, path.as_deref())?
                .with_context(|| format!("File not found: {file_id}"))?;
            emit(&file, cli.format, &urls)
        }
        Commands::Content { file_id, path } => {
            let info = session
                .get_file_sha1(&file_id)?
                .with_context(|| format!("No content for file: {file_id}"))?;
            let plan = content::file_content(&config.content_store(), &info, path.as_deref());

            println!("path: {}", plan.path.display());
            match plan.disposition {
                Disposition::Attachment { filename } => {
                    println!("content-disposition: attachment; filename={filename}")
                }
                Disposition::Inline => println!("content-disposition: inline"),
            }
            println!("content-type: {}", plan.content_type);
            println!("content-encoding: {}", plan.content_encoding);
            Ok(())
        }
        Commands::Logfile { file_id, output } => {
            let info = session
                .get_file_sha1(&file_id)?
                .with_context(|| format!("No content for file: {file_id}"))?;
            let chunks = content::log_content(
                &config.content_store(),
                &info,
                config.content.chunk_size,
            )?;

            let mut out: Box<dyn Write> = match output {
                Some(ref path) => Box::new(File::create(path)?),
                None => Box::new(io::stdout().lock()),
            };

            let mut total = 0usize;
            for chunk in chunks {
                let chunk = chunk?;
                total += chunk.len();
                out.write_all(&chunk)?;
            }
            out.flush()?;
            info!("Wrote {} compressed bytes of log {}", total, file_id);
            Ok(())
        }
    }
}
