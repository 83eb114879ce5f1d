//! Recurring ingestion with at most one run in flight.
//!
//! # Triggers
//!
//! Runs start from the timer loop ([`Scheduler::start`]) or from
//! [`Scheduler::trigger_now`]. Both go through the same gate: an atomic
//! `in_flight` flag. A trigger that finds a run in flight sets a single
//! `pending` flag and returns [`TriggerOutcome::Coalesced`]; when the run
//! finishes, one follow-up run starts if the flag is set. Any number of
//! triggers during one run therefore queue exactly one more run.
//!
//! Every run executes on its own task and holds the gate through a
//! [`RunGuard`], so a caller that stops waiting (timeout, dropped request)
//! or a run that panics still releases it.
//!
//! # Cadence
//!
//! The next tick is scheduled `interval` after the previous run finished,
//! including a follow-up queued behind it, so slow runs never pile up.
//! [`Scheduler::stop`] lets an in-flight run complete, drops any queued
//! follow-up and schedules nothing further.

use crate::error::ConfigError;
use crate::models::{BatchResult, SourceId};
use crate::orchestrator::Orchestrator;
use crate::store::ArticleStore;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument};

/// Interval and source list the timer loop runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cadence {
    pub interval: Duration,
    pub active: Vec<SourceId>,
}

impl Cadence {
    pub fn new(interval_seconds: u64, active: Vec<SourceId>) -> Result<Self, ConfigError> {
        if interval_seconds == 0 {
            return Err(ConfigError::InvalidCadence(
                "interval must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            interval: Duration::from_secs(interval_seconds),
            active,
        })
    }
}

/// Result of asking for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    Ran(BatchResult),
    /// A run was already in flight; one follow-up run is queued behind it.
    Coalesced,
    /// The run task panicked; the gate has been released.
    Aborted(String),
}

/// Ownership of the `in_flight` gate for one run.
struct RunGuard(Arc<Scheduler>);

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.0.release();
    }
}

pub struct Scheduler {
    orchestrator: Arc<Orchestrator>,
    store: Arc<dyn ArticleStore>,
    in_flight: AtomicBool,
    pending: AtomicBool,
    completed: AtomicU64,
    /// Bumped every time a run gives up the gate.
    released: watch::Sender<u64>,
    cadence: watch::Sender<Cadence>,
    stop: watch::Sender<bool>,
}

impl Scheduler {
    pub fn new(orchestrator: Arc<Orchestrator>, store: Arc<dyn ArticleStore>, cadence: Cadence) -> Arc<Self> {
        let (cadence, _) = watch::channel(cadence);
        let (stop, _) = watch::channel(false);
        let (released, _) = watch::channel(0);
        Arc::new(Self {
            orchestrator,
            store,
            in_flight: AtomicBool::new(false),
            pending: AtomicBool::new(false),
            completed: AtomicU64::new(0),
            released,
            cadence,
            stop,
        })
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Runs finished since the scheduler was created.
    pub fn completed_runs(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    /// Change interval and sources; applies from the next wait.
    pub fn configure(&self, interval_seconds: u64, active: Vec<SourceId>) -> Result<(), ConfigError> {
        let cadence = Cadence::new(interval_seconds, active)?;
        info!(interval = ?cadence.interval, sources = ?cadence.active, "Cadence updated");
        self.cadence.send_replace(cadence);
        Ok(())
    }

    /// Start the timer loop. The first run starts immediately.
    pub fn start(
        self: &Arc<Self>,
        interval_seconds: u64,
        active: Vec<SourceId>,
    ) -> Result<JoinHandle<()>, ConfigError> {
        let cadence = Cadence::new(interval_seconds, active)?;
        self.cadence.send_replace(cadence);
        self.stop.send_replace(false);

        let this = Arc::clone(self);
        let mut stop_rx = self.stop.subscribe();
        let mut cadence_rx = self.cadence.subscribe();
        Ok(tokio::spawn(async move {
            info!(interval = ?this.cadence().interval, "Scheduler started");
            'ticks: loop {
                if *stop_rx.borrow() {
                    break;
                }
                if let TriggerOutcome::Coalesced = this.trigger_now().await {
                    debug!("Tick coalesced into the run in flight");
                }
                this.wait_idle().await;
                loop {
                    let interval = cadence_rx.borrow_and_update().interval;
                    tokio::select! {
                        _ = sleep(interval) => break,
                        changed = stop_rx.changed() => {
                            if changed.is_err() || *stop_rx.borrow() {
                                break 'ticks;
                            }
                        }
                        changed = cadence_rx.changed() => {
                            if changed.is_err() {
                                break 'ticks;
                            }
                            debug!("Cadence changed; restarting wait");
                        }
                    }
                }
            }
            info!("Scheduler stopped");
        }))
    }

    /// Stop scheduling ticks. A run in flight finishes normally.
    pub fn stop(&self) {
        info!("Scheduler stop requested");
        self.pending.store(false, Ordering::SeqCst);
        self.stop.send_replace(true);
    }

    /// Wait until no run is in flight and no follow-up has taken over.
    pub async fn wait_idle(&self) {
        let mut released = self.released.subscribe();
        while self.is_running() {
            if released.changed().await.is_err() {
                break;
            }
        }
    }

    /// Run now, or queue one follow-up run if a run is in flight.
    #[instrument(level = "info", skip_all)]
    pub async fn trigger_now(self: &Arc<Self>) -> TriggerOutcome {
        if !self.acquire() {
            self.pending.store(true, Ordering::SeqCst);
            // The run in flight may have released between the two checks.
            if !self.acquire() {
                info!("Run in flight; trigger coalesced");
                return TriggerOutcome::Coalesced;
            }
        }
        self.pending.store(false, Ordering::SeqCst);
        match self.spawn_run(&Handle::current()).await {
            Ok(batch) => TriggerOutcome::Ran(batch),
            Err(e) => {
                error!(error = %e, "Run task failed");
                TriggerOutcome::Aborted(e.to_string())
            }
        }
    }

    fn acquire(&self) -> bool {
        self.in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Run on its own task; the caller must already hold the gate.
    fn spawn_run(self: &Arc<Self>, handle: &Handle) -> JoinHandle<BatchResult> {
        let guard = RunGuard(Arc::clone(self));
        handle.spawn(async move {
            let batch = guard.0.execute().await;
            drop(guard);
            batch
        })
    }

    /// Give up the gate, or hand it straight to a queued follow-up.
    fn release(self: &Arc<Self>) {
        loop {
            if self.pending.swap(false, Ordering::SeqCst) {
                if let Ok(handle) = Handle::try_current() {
                    info!("Starting queued run");
                    self.spawn_run(&handle);
                    break;
                }
            }
            self.in_flight.store(false, Ordering::SeqCst);
            // A trigger may have set `pending` after the swap but tried the
            // gate before the store.
            if !self.pending.load(Ordering::SeqCst) || !self.acquire() {
                break;
            }
        }
        self.released.send_modify(|n| *n += 1);
    }

    async fn execute(&self) -> BatchResult {
        let active = self.cadence.borrow().active.clone();
        let batch = self.orchestrator.run_once(&active).await;
        match self.store.store(&batch.articles).await {
            Ok(report) => info!(
                inserted = report.inserted,
                duplicates = report.duplicates_skipped,
                "Batch stored"
            ),
            Err(e) => error!(error = %e, "Storing batch failed"),
        }
        if batch.is_total_failure() {
            error!(failed = batch.failed_count(), "Every source failed");
        }
        self.completed.fetch_add(1, Ordering::SeqCst);
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunLimits;
    use crate::error::{FetchError, StoreError};
    use crate::extract::selector::ProbeSpec::{Attr, Text};
    use crate::fetch::{FetchedPage, PageFetcher};
    use crate::models::{CanonicalArticle, PageKind};
    use crate::registry::SourceRegistry;
    use crate::store::{MemoryStore, StoreReport};
    use crate::strategy::{FieldMap, LayoutSpec, SourceStrategy};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    /// Slow fetcher that records how many fetches overlap.
    #[derive(Default)]
    struct Gauge {
        calls: AtomicUsize,
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    #[async_trait]
    impl PageFetcher for Gauge {
        async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            sleep(Duration::from_secs(1)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(FetchedPage {
                url: url.to_string(),
                body: format!(r#"<li class="story"><h3>Story {n}</h3><a href="/story/{n}">x</a></li>"#),
            })
        }
    }

    /// Panics on its first batch, then stores nothing.
    #[derive(Default)]
    struct PanicOnce {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ArticleStore for PanicOnce {
        async fn store(&self, _articles: &[CanonicalArticle]) -> Result<StoreReport, StoreError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("disk on fire");
            }
            Ok(StoreReport::default())
        }
    }

    fn scheduler(gauge: Arc<Gauge>, store: Arc<dyn ArticleStore>) -> Arc<Scheduler> {
        let strategy = SourceStrategy::builder(SourceId::new("demo"), "Demo", "https://demo.test")
            .target("/markets")
            .layout(
                PageKind::ListingItem,
                LayoutSpec::list(&["li.story"])
                    .field("headline", &[Text("h3")])
                    .field("link", &[Attr("a", "href")]),
            )
            .fields(FieldMap::required("headline", "link"))
            .build()
            .unwrap();
        let mut registry = SourceRegistry::new();
        registry.register(strategy).unwrap();
        let orchestrator = Arc::new(Orchestrator::new(registry.freeze(), gauge, RunLimits::default()));
        Scheduler::new(
            orchestrator,
            store,
            Cadence::new(60, vec![SourceId::new("demo")]).unwrap(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn triggers_during_a_run_queue_exactly_one_more() {
        let gauge = Arc::new(Gauge::default());
        let store = Arc::new(MemoryStore::new());
        let s = scheduler(gauge.clone(), store.clone());

        let first = tokio::spawn({
            let s = Arc::clone(&s);
            async move { s.trigger_now().await }
        });
        sleep(Duration::from_millis(10)).await;
        assert!(s.is_running());

        assert_eq!(s.trigger_now().await, TriggerOutcome::Coalesced);
        assert_eq!(s.trigger_now().await, TriggerOutcome::Coalesced);

        let TriggerOutcome::Ran(batch) = first.await.unwrap() else {
            panic!("first trigger should have run");
        };
        assert_eq!(batch.articles.len(), 1);

        sleep(Duration::from_secs(5)).await;
        assert!(!s.is_running());
        assert_eq!(s.completed_runs(), 2);
        assert_eq!(gauge.calls.load(Ordering::SeqCst), 2);
        assert_eq!(gauge.max_active.load(Ordering::SeqCst), 1);
        assert_eq!(store.snapshot().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_trigger_runs_inline() {
        let s = scheduler(Arc::new(Gauge::default()), Arc::new(MemoryStore::new()));
        assert!(matches!(s.trigger_now().await, TriggerOutcome::Ran(_)));
        assert!(matches!(s.trigger_now().await, TriggerOutcome::Ran(_)));
        assert_eq!(s.completed_runs(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_waits_after_completion_and_stops_cleanly() {
        let gauge = Arc::new(Gauge::default());
        let s = scheduler(gauge.clone(), Arc::new(MemoryStore::new()));

        let handle = s.start(60, vec![SourceId::new("demo")]).unwrap();
        // Runs at t=0..1 and t=61..62.
        sleep(Duration::from_secs(90)).await;
        assert_eq!(s.completed_runs(), 2);

        s.stop();
        handle.await.unwrap();
        sleep(Duration::from_secs(600)).await;
        assert_eq!(s.completed_runs(), 2);
        assert_eq!(gauge.max_active.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_trigger_still_releases_the_gate() {
        let gauge = Arc::new(Gauge::default());
        let s = scheduler(gauge.clone(), Arc::new(MemoryStore::new()));

        let waited = tokio::time::timeout(Duration::from_millis(100), s.trigger_now()).await;
        assert!(waited.is_err());

        sleep(Duration::from_secs(5)).await;
        assert!(!s.is_running());
        assert_eq!(s.completed_runs(), 1);
        assert!(matches!(s.trigger_now().await, TriggerOutcome::Ran(_)));
        assert_eq!(s.completed_runs(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_run_releases_the_gate() {
        let s = scheduler(Arc::new(Gauge::default()), Arc::new(PanicOnce::default()));

        assert!(matches!(s.trigger_now().await, TriggerOutcome::Aborted(_)));
        assert!(!s.is_running());
        assert!(matches!(s.trigger_now().await, TriggerOutcome::Ran(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn coalesced_tick_waits_for_the_follow_up() {
        let s = scheduler(Arc::new(Gauge::default()), Arc::new(MemoryStore::new()));

        // Manual run at t=0..1; the first tick coalesces, so its follow-up
        // runs t=1..2 and the next tick is due at t=62.
        let manual = tokio::spawn({
            let s = Arc::clone(&s);
            async move { s.trigger_now().await }
        });
        sleep(Duration::from_millis(10)).await;
        let handle = s.start(60, vec![SourceId::new("demo")]).unwrap();
        manual.await.unwrap();

        sleep(Duration::from_millis(61_500)).await;
        assert_eq!(s.completed_runs(), 2);
        sleep(Duration::from_secs(2)).await;
        assert_eq!(s.completed_runs(), 3);

        s.stop();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_drops_the_queued_follow_up() {
        let s = scheduler(Arc::new(Gauge::default()), Arc::new(MemoryStore::new()));

        let first = tokio::spawn({
            let s = Arc::clone(&s);
            async move { s.trigger_now().await }
        });
        sleep(Duration::from_millis(10)).await;
        assert_eq!(s.trigger_now().await, TriggerOutcome::Coalesced);
        s.stop();

        assert!(matches!(first.await.unwrap(), TriggerOutcome::Ran(_)));
        sleep(Duration::from_secs(5)).await;
        assert_eq!(s.completed_runs(), 1);
        assert!(!s.is_running());
    }

    #[tokio::test]
    async fn zero_interval_is_a_config_error() {
        let s = scheduler(Arc::new(Gauge::default()), Arc::new(MemoryStore::new()));
        assert!(matches!(
            s.start(0, vec![SourceId::new("demo")]),
            Err(ConfigError::InvalidCadence(_))
        ));
        assert!(s.configure(0, vec![]).is_err());
        s.configure(30, vec![SourceId::FT]).unwrap();
        assert_eq!(s.cadence().interval, Duration::from_secs(30));
    }
}
