//! Storage collaborator.
//!
//! The ingestion core hands each batch to an [`ArticleStore`]. Deduplication
//! by `(source, url)` is the store's job; the core only guarantees that the
//! key of an article is stable across runs.

use crate::error::StoreError;
use crate::models::{ArticleKey, CanonicalArticle};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Mutex;

/// What a store did with one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreReport {
    pub inserted: usize,
    pub duplicates_skipped: usize,
}

#[async_trait]
pub trait ArticleStore: Send + Sync {
    async fn store(&self, articles: &[CanonicalArticle]) -> Result<StoreReport, StoreError>;
}

/// Keys already stored, shared by the in-process stores.
#[derive(Debug, Default)]
pub(crate) struct SeenKeys(Mutex<HashSet<ArticleKey>>);

impl SeenKeys {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashSet<ArticleKey>>, StoreError> {
        self.0
            .lock()
            .map_err(|_| StoreError::Unavailable("seen-key set poisoned".to_string()))
    }

    /// Split `articles` into unseen ones (returned) and duplicates (counted)
    /// without recording anything.
    pub(crate) fn unseen<'a>(
        &self,
        articles: &'a [CanonicalArticle],
    ) -> Result<(Vec<&'a CanonicalArticle>, usize), StoreError> {
        let seen = self.lock()?;
        let mut batch = HashSet::new();
        let mut fresh = Vec::new();
        let mut dups = 0usize;
        for a in articles {
            let key = a.key();
            if seen.contains(&key) || !batch.insert(key) {
                dups += 1;
            } else {
                fresh.push(a);
            }
        }
        Ok((fresh, dups))
    }

    /// Mark articles as stored; call once they are durably written.
    pub(crate) fn record<'a>(
        &self,
        articles: impl IntoIterator<Item = &'a CanonicalArticle>,
    ) -> Result<(), StoreError> {
        let mut seen = self.lock()?;
        seen.extend(articles.into_iter().map(CanonicalArticle::key));
        Ok(())
    }
}

/// Process-local store; keeps every inserted article in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    seen: SeenKeys,
    articles: Mutex<Vec<CanonicalArticle>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<CanonicalArticle> {
        self.articles.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn store(&self, articles: &[CanonicalArticle]) -> Result<StoreReport, StoreError> {
        let (fresh, dups) = self.seen.unseen(articles)?;
        let inserted = fresh.len();
        self.articles
            .lock()
            .map_err(|_| StoreError::Unavailable("article list poisoned".to_string()))?
            .extend(fresh.iter().copied().cloned());
        self.seen.record(fresh)?;
        Ok(StoreReport {
            inserted,
            duplicates_skipped: dups,
        })
    }
}
