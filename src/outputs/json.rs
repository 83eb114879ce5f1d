//! JSON file output for ingested articles.
//!
//! [`JsonStore`] is an [`ArticleStore`] that writes each batch's newly seen
//! articles to a dated file. Keys already written by this process are
//! skipped, so rerunning against the same pages does not grow the output.
//!
//! # Output Structure
//!
//! ```text
//! json_output_dir/
//! └── 2026-10-16/
//!     ├── 09-00-00.123.json
//!     └── 09-15-00.481.json
//! ```

use crate::error::StoreError;
use crate::models::CanonicalArticle;
use crate::store::{ArticleStore, SeenKeys, StoreReport};
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument};

#[derive(Debug)]
pub struct JsonStore {
    dir: PathBuf,
    seen: SeenKeys,
}

impl JsonStore {
    /// Open a store rooted at `dir`, creating it and checking it is writable.
    ///
    /// The write test creates and immediately deletes a probe file.
    #[instrument(level = "info", skip_all, fields(dir = %dir.as_ref().display()))]
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        let io_err = |path: &Path, source| StoreError::Io {
            path: path.display().to_string(),
            source,
        };
        fs::create_dir_all(&dir).await.map_err(|e| io_err(&dir, e))?;
        let probe = dir.join("..__probe_write__");
        fs::write(&probe, b"").await.map_err(|e| io_err(&probe, e))?;
        let _ = fs::remove_file(&probe).await;
        info!("Output directory is writable");
        Ok(Self {
            dir,
            seen: SeenKeys::default(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ArticleStore for JsonStore {
    #[instrument(level = "info", skip_all, fields(dir = %self.dir.display()))]
    async fn store(&self, articles: &[CanonicalArticle]) -> Result<StoreReport, StoreError> {
        // Keys are recorded only after the file is written, so a failed
        // write is retried on the next batch.
        let (fresh, dups) = self.seen.unseen(articles)?;
        let report = StoreReport {
            inserted: fresh.len(),
            duplicates_skipped: dups,
        };
        if fresh.is_empty() {
            debug!(dups, "Nothing new to write");
            return Ok(report);
        }

        let now = Utc::now();
        let day_dir = self.dir.join(now.format("%Y-%m-%d").to_string());
        fs::create_dir_all(&day_dir).await.map_err(|e| StoreError::Io {
            path: day_dir.display().to_string(),
            source: e,
        })?;
        let path = day_dir.join(format!("{}.json", now.format("%H-%M-%S%.3f")));
        let json = serde_json::to_string_pretty(&fresh)?;
        fs::write(&path, json).await.map_err(|e| StoreError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        self.seen.record(fresh)?;
        info!(path = %path.display(), inserted = report.inserted, dups, "Wrote articles JSON");
        Ok(report)
    }
}
