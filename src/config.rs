//! Ingestion configuration.
//!
//! Loaded from an optional YAML file, then overridden by command-line flags.
//! Keys are camelCase:
//!
//! ```yaml
//! intervalSeconds: 900
//! activeSourceIds: [ft, yahoo]
//! perSourceArticleCeiling: 5
//! pageTimeoutMs: 10000
//! runTimeoutMs: 300000
//! ```

use crate::error::ConfigError;
use crate::fetch::DEFAULT_USER_AGENT;
use crate::models::SourceId;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IngestConfig {
    /// Pause between the end of one run and the start of the next.
    pub interval_seconds: u64,
    pub active_source_ids: Vec<SourceId>,
    /// Article pages followed per source per run.
    pub per_source_article_ceiling: usize,
    /// Overrides every strategy's own list ceiling when set.
    pub listing_item_ceiling: Option<usize>,
    pub page_timeout_ms: u64,
    pub run_timeout_ms: u64,
    pub max_parallel_sources: usize,
    pub user_agent: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 15 * 60,
            active_source_ids: vec![
                SourceId::FT,
                SourceId::BLOOMBERG,
                SourceId::YAHOO,
                SourceId::REUTERS,
            ],
            per_source_article_ceiling: 5,
            listing_item_ceiling: None,
            page_timeout_ms: 10_000,
            run_timeout_ms: 5 * 60 * 1000,
            max_parallel_sources: 4,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl IngestConfig {
    pub fn from_yaml(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let cfg: IngestConfig = serde_yaml::from_str(text).map_err(|e| ConfigError::Parse {
            path: origin.to_string(),
            source: e,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml(&text, &path.display().to_string())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let bad = |msg: &str| Err(ConfigError::InvalidCadence(msg.to_string()));
        if self.interval_seconds == 0 {
            return bad("intervalSeconds must be greater than zero");
        }
        if self.page_timeout_ms == 0 {
            return bad("pageTimeoutMs must be greater than zero");
        }
        if self.run_timeout_ms < self.page_timeout_ms {
            return bad("runTimeoutMs must be at least pageTimeoutMs");
        }
        if self.max_parallel_sources == 0 {
            return bad("maxParallelSources must be greater than zero");
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn limits(&self) -> RunLimits {
        RunLimits {
            article_ceiling: self.per_source_article_ceiling,
            listing_ceiling: self.listing_item_ceiling,
            page_timeout: Duration::from_millis(self.page_timeout_ms),
            run_timeout: Duration::from_millis(self.run_timeout_ms),
            max_parallel_sources: self.max_parallel_sources,
        }
    }
}

/// The part of the configuration the orchestrator needs for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunLimits {
    pub article_ceiling: usize,
    pub listing_ceiling: Option<usize>,
    pub page_timeout: Duration,
    pub run_timeout: Duration,
    pub max_parallel_sources: usize,
}

impl Default for RunLimits {
    fn default() -> Self {
        IngestConfig::default().limits()
    }
}
