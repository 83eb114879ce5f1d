//! Command-line interface definitions for finwire.
//!
//! Every flag can also come from the environment. Flags override the YAML
//! config file, which overrides the built-in defaults.

use crate::config::IngestConfig;
use crate::models::SourceId;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # One run over every built-in source
/// finwire --once -j ./json
///
/// # Service mode, every 5 minutes, two sources
/// finwire -j ./json --interval-seconds 300 --sources ft,yahoo
///
/// # Settings from a file
/// finwire -j ./json -c finwire.yaml
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Output directory for the JSON article files
    #[arg(short, long, env = "FINWIRE_JSON_DIR")]
    pub json_output_dir: PathBuf,

    /// Optional path to a YAML config file
    #[arg(short, long, env = "FINWIRE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Run once, write the batch and exit
    #[arg(long)]
    pub once: bool,

    /// Seconds between the end of one run and the start of the next
    #[arg(long, env = "FINWIRE_INTERVAL_SECONDS")]
    pub interval_seconds: Option<u64>,

    /// Comma-separated source ids to run (default: all)
    #[arg(long, env = "FINWIRE_SOURCES", value_delimiter = ',')]
    pub sources: Option<Vec<String>>,

    /// Per-page fetch timeout in milliseconds
    #[arg(long, env = "FINWIRE_PAGE_TIMEOUT_MS")]
    pub page_timeout_ms: Option<u64>,

    /// Article pages followed per source per run
    #[arg(long, env = "FINWIRE_ARTICLE_CEILING")]
    pub article_ceiling: Option<usize>,
}

impl Cli {
    /// Apply the flags that were given on top of `cfg`.
    pub fn apply(&self, mut cfg: IngestConfig) -> IngestConfig {
        if let Some(secs) = self.interval_seconds {
            cfg.interval_seconds = secs;
        }
        if let Some(ids) = &self.sources {
            cfg.active_source_ids = ids
                .iter()
                .filter(|s| !s.trim().is_empty())
                .map(SourceId::new)
                .collect();
        }
        if let Some(ms) = self.page_timeout_ms {
            cfg.page_timeout_ms = ms;
        }
        if let Some(n) = self.article_ceiling {
            cfg.per_source_article_ceiling = n;
        }
        cfg
    }
}
