//! Run orchestrator: one pass over the active sources.
//!
//! # Pipeline
//!
//! For every active source, independently:
//!
//! 1. Fetch each target page (per-page timeout, retried at most once)
//! 2. Classify, extract and normalize the page synchronously
//! 3. On list pages of sources that follow articles, queue the same-host
//!    article links up to the per-source article ceiling
//! 4. Fetch and process the queued article pages; an article already seen
//!    on a list page is merged in place, never duplicated
//!
//! # Failure Isolation
//!
//! Every page, item and source result is a `Result<_, ExtractionFault>`
//! folded into that source's [`SourceOutcome`]. Nothing a source does can
//! abort another source or the run; [`Orchestrator::run_once`] always
//! returns a complete [`BatchResult`].
//!
//! # Limits
//!
//! Sources run concurrently, at most `max_parallel_sources` at a time. A
//! source that has not started when the run timeout expires, or after
//! [`Orchestrator::cancel`], is marked `skipped` rather than failed. A source
//! already running stops fetching further pages once the deadline passes.

use crate::classify::Classification;
use crate::config::RunLimits;
use crate::error::{ExtractionFault, FetchError};
use crate::extract::extract_capped;
use crate::fetch::{FetchedPage, PageFetcher, RetryFetch, TimeoutFetch};
use crate::models::{BatchResult, CanonicalArticle, PageKind, SourceId, SourceOutcome};
use crate::normalize::normalize;
use crate::registry::SourceRegistry;
use crate::strategy::SourceStrategy;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use scraper::Html;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};
use url::Url;

type Fetcher = RetryFetch<TimeoutFetch<Arc<dyn PageFetcher>>>;

/// What one fetched page produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageYield {
    pub kind: PageKind,
    pub warning: Option<String>,
    /// Page order; rejected items keep their slot as an `Err`.
    pub items: Vec<Result<CanonicalArticle, ExtractionFault>>,
}

/// Classify, extract and normalize one fetched page.
///
/// `listing_ceiling` overrides the layout's own item ceiling when set.
pub fn process_page(
    strategy: &SourceStrategy,
    page: &FetchedPage,
    listing_ceiling: Option<usize>,
) -> PageYield {
    let dom = Html::parse_document(&page.body);
    let Classification { kind, warning } = strategy.classify(&page.url, &dom);
    let ceiling = listing_ceiling
        .or_else(|| strategy.layout(kind).map(|l| l.item_ceiling))
        .unwrap_or(0);
    let items = extract_capped(strategy, kind, &dom, ceiling)
        .iter()
        .map(|raw| normalize(strategy, kind, raw).map_err(ExtractionFault::from))
        .collect();
    PageYield {
        kind,
        warning,
        items,
    }
}

/// Articles and outcome for one source, merged by url as pages arrive.
#[derive(Debug, Default)]
struct SourceRun {
    articles: Vec<CanonicalArticle>,
    by_url: HashMap<String, usize>,
    outcome: SourceOutcome,
}

impl SourceRun {
    fn skipped() -> Self {
        let mut run = SourceRun::default();
        run.outcome.skipped = true;
        run
    }

    fn collect(&mut self, article: CanonicalArticle) {
        match self.by_url.get(&article.url) {
            Some(&i) => self.articles[i].absorb(article),
            None => {
                self.by_url.insert(article.url.clone(), self.articles.len());
                self.articles.push(article);
                self.outcome.succeeded += 1;
            }
        }
    }

    /// Fold a page into the run; returns the urls of the accepted items.
    fn absorb_page(&mut self, source: &SourceId, page: PageYield) -> Vec<String> {
        if let Some(w) = page.warning {
            self.outcome.warnings.push(w);
        }
        let mut urls = Vec::new();
        for item in page.items {
            match item {
                Ok(article) => {
                    urls.push(article.url.clone());
                    self.collect(article);
                }
                Err(fault) => {
                    debug!(%source, error = %fault, "Item rejected");
                    self.outcome.tally::<()>(Err(fault));
                }
            }
        }
        urls
    }
}

pub struct Orchestrator {
    registry: Arc<SourceRegistry>,
    fetcher: Fetcher,
    limits: RunLimits,
    cancelled: AtomicBool,
}

impl Orchestrator {
    /// Wraps `fetcher` with the per-page timeout and a single retry.
    pub fn new(registry: Arc<SourceRegistry>, fetcher: Arc<dyn PageFetcher>, limits: RunLimits) -> Self {
        Self {
            registry,
            fetcher: RetryFetch::once(TimeoutFetch::new(fetcher, limits.page_timeout)),
            limits,
            cancelled: AtomicBool::new(false),
        }
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn limits(&self) -> &RunLimits {
        &self.limits
    }

    /// Ask runs to stop at the next source boundary.
    ///
    /// Sticky: every later run skips all of its sources.
    pub fn cancel(&self) {
        info!("Orchestrator cancellation requested");
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn out_of_time(&self, deadline: Instant) -> bool {
        self.is_cancelled() || Instant::now() >= deadline
    }

    /// Run every active source once and collect the batch.
    ///
    /// Repeated ids are run once. Unknown ids are recorded as a failed source.
    #[instrument(level = "info", skip_all, fields(sources = active.len()))]
    pub async fn run_once(&self, active: &[SourceId]) -> BatchResult {
        let started_at = Utc::now();
        let deadline = Instant::now() + self.limits.run_timeout;
        let ids: Vec<SourceId> = active.iter().cloned().unique().collect();

        let runs: Vec<(SourceId, SourceRun)> = stream::iter(ids)
            .map(|id| async move {
                let run = self.run_source(&id, deadline).await;
                (id, run)
            })
            .buffer_unordered(self.limits.max_parallel_sources.max(1))
            .collect()
            .await;

        let mut articles = Vec::new();
        let mut outcomes = BTreeMap::new();
        for (id, run) in runs {
            info!(
                source = %id,
                succeeded = run.outcome.succeeded,
                failed = run.outcome.failed,
                skipped = run.outcome.skipped,
                "Source finished"
            );
            articles.extend(run.articles);
            outcomes.insert(id, run.outcome);
        }

        let batch = BatchResult {
            started_at,
            finished_at: Utc::now(),
            articles,
            outcomes,
        };
        info!(
            articles = batch.articles.len(),
            failed = batch.failed_count(),
            elapsed_ms = (batch.finished_at - batch.started_at).num_milliseconds(),
            "Run complete"
        );
        batch
    }

    #[instrument(level = "info", skip_all, fields(source = %id))]
    async fn run_source(&self, id: &SourceId, deadline: Instant) -> SourceRun {
        if self.out_of_time(deadline) {
            warn!("Run cancelled or out of time; skipping source");
            return SourceRun::skipped();
        }
        let mut run = SourceRun::default();
        let strategy = match self.registry.get(id) {
            Ok(s) => Arc::clone(s),
            Err(e) => {
                warn!(error = %e, "Active source has no strategy");
                run.outcome.tally::<()>(Err(ExtractionFault::UnknownSource(id.clone())));
                return run;
            }
        };

        let mut visited: HashSet<String> = HashSet::new();
        let mut follow: Vec<String> = Vec::new();

        for target in strategy.targets() {
            if self.out_of_time(deadline) {
                run.outcome.warnings.push(format!("stopped before {target}: run deadline"));
                return run;
            }
            visited.insert(target.to_string());
            let Some(page) = self.fetch_page(target.as_str(), &mut run.outcome).await else {
                continue;
            };
            let yielded = process_page(&strategy, &page, self.limits.listing_ceiling);
            let listing = yielded.kind.is_list();
            let urls = run.absorb_page(id, yielded);
            if listing && strategy.follows_articles() {
                for url in urls {
                    if follow.len() >= self.limits.article_ceiling {
                        break;
                    }
                    if !follow.contains(&url) && is_followable(&strategy, &url) {
                        follow.push(url);
                    }
                }
            }
        }

        for url in follow {
            if !visited.insert(url.clone()) {
                continue;
            }
            if self.out_of_time(deadline) {
                run.outcome.warnings.push(format!("stopped before {url}: run deadline"));
                break;
            }
            let Some(page) = self.fetch_page(&url, &mut run.outcome).await else {
                continue;
            };
            let yielded = process_page(&strategy, &page, self.limits.listing_ceiling);
            run.absorb_page(id, yielded);
        }
        run
    }

    async fn fetch_page(&self, url: &str, outcome: &mut SourceOutcome) -> Option<FetchedPage> {
        let result: Result<FetchedPage, FetchError> = self.fetcher.fetch(url).await;
        if let Err(e) = &result {
            warn!(%url, error = %e, "Page failed");
        }
        outcome.tally(result.map_err(ExtractionFault::from))
    }
}

/// Same host as the source and routed to the article extractor.
fn is_followable(strategy: &SourceStrategy, url: &str) -> bool {
    let same_host = Url::parse(url)
        .ok()
        .is_some_and(|u| u.host_str() == strategy.base_url().host_str());
    same_host && strategy.classify_url(url) == PageKind::FullArticle
}
