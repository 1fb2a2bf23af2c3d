// src/pipeline/watch.rs

//! Polling orchestration.
//!
//! A [`Watcher`] logs in once, then alternates passes and sleeps until it
//! is interrupted, a pass fails, or (in single-pass mode) the first pass
//! ends. Passes are timed from start to start: a slow pass shortens the
//! following sleep instead of delaying every later pass.

use std::sync::Arc;

use chrono::Utc;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::models::{Config, MIN_INTERVAL_SECS};
use crate::pipeline::alert::{AlertDispatcher, AlertOutcome};
use crate::pipeline::diff::{Change, ChangeDetector};
use crate::pipeline::paginate::PaginatedFetcher;
use crate::pipeline::parse::RecordParser;
use crate::pipeline::select::select_best;
use crate::services::{AuthenticatedFetcher, Notifier, TextExtractor};
use crate::storage::{StateGuard, StateStore};
use crate::utils::shutdown::Shutdown;

/// Counters for one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub lists: usize,
    pub pages: usize,
    pub records: usize,
    pub new: usize,
    pub changed: usize,
    pub unchanged: usize,
    pub alerts_sent: usize,
    pub alerts_suppressed: usize,
    pub interrupted: bool,
}

/// Drives passes over every configured list.
pub struct Watcher {
    config: Config,
    fetcher: Arc<dyn AuthenticatedFetcher>,
    extractor: Arc<dyn TextExtractor>,
    notifier: Arc<dyn Notifier>,
    parser: RecordParser,
    detector: ChangeDetector,
    shutdown: Shutdown,
}

impl Watcher {
    pub fn new(
        config: Config,
        fetcher: Arc<dyn AuthenticatedFetcher>,
        extractor: Arc<dyn TextExtractor>,
        notifier: Arc<dyn Notifier>,
        shutdown: Shutdown,
    ) -> Result<Self> {
        let parser = RecordParser::new(&config.watch.targets)?;
        if config.watch.interval_secs < MIN_INTERVAL_SECS {
            warn!(
                configured = config.watch.interval_secs,
                used = MIN_INTERVAL_SECS,
                "Interval too short, raised to the minimum"
            );
        }

        Ok(Self {
            config,
            fetcher,
            extractor,
            notifier,
            parser,
            detector: ChangeDetector::new(),
            shutdown,
        })
    }

    /// Run until interrupted, or for a single pass when `once` is set.
    ///
    /// State is loaded here and written back on every exit path, including
    /// failures.
    pub async fn run(&self, once: bool) -> Result<()> {
        info!(
            once,
            lists = self.config.lists.len(),
            targets = self.config.watch.targets.len(),
            "Starting watcher"
        );

        let mut state = StateGuard::open(StateStore::new(&self.config.watch.state_file)).await?;
        let outcome = self.run_loop(&mut state, once).await;
        let flushed = state.close().await;

        if let Err(e) = &flushed {
            error!(error = %e, "Failed to persist state on exit");
        }
        outcome?;
        flushed?;
        info!("Watcher stopped");
        Ok(())
    }

    /// Log into every configured portal, in order.
    pub async fn login(&self) -> Result<()> {
        for login in &self.config.logins {
            self.fetcher.login(login).await?;
        }
        Ok(())
    }

    async fn run_loop(&self, state: &mut StateGuard, once: bool) -> Result<()> {
        self.login().await?;

        let interval = self.config.watch.interval();
        let mut shutdown = self.shutdown.clone();
        loop {
            let started = Instant::now();
            let summary = self.run_pass(state).await?;
            let elapsed = started.elapsed();

            if once || summary.interrupted || shutdown.is_requested() {
                info!(elapsed_secs = elapsed.as_secs_f64(), "Pass completed");
                return Ok(());
            }

            let pause = interval.saturating_sub(elapsed);
            info!(
                elapsed_secs = elapsed.as_secs_f64(),
                sleep_secs = pause.as_secs(),
                "Pass completed, sleeping"
            );
            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = shutdown.requested() => {
                    info!("Interrupted while sleeping");
                    return Ok(());
                }
            }
        }
    }

    /// One sweep of all lists; state is flushed at the end whatever happens.
    pub async fn run_pass(&self, state: &mut StateGuard) -> Result<PassSummary> {
        info!(targets = self.config.watch.targets.len(), "Fetching lists");
        let mut summary = PassSummary::default();

        let outcome = self.sweep(state, &mut summary).await;
        let flushed = state.flush().await;
        outcome?;
        flushed?;

        info!(
            lists = summary.lists,
            pages = summary.pages,
            records = summary.records,
            new = summary.new,
            changed = summary.changed,
            unchanged = summary.unchanged,
            alerts_sent = summary.alerts_sent,
            alerts_suppressed = summary.alerts_suppressed,
            interrupted = summary.interrupted,
            "Pass summary"
        );
        Ok(summary)
    }

    async fn sweep(&self, state: &mut StateGuard, summary: &mut PassSummary) -> Result<()> {
        let pager = PaginatedFetcher::new(
            self.fetcher.as_ref(),
            self.extractor.as_ref(),
            &self.parser,
            self.config.watch.page_limit,
        );
        let dispatcher = AlertDispatcher::new(
            &self.config.watch,
            self.config.discord.as_ref(),
            self.notifier.as_ref(),
        );

        for (url, label) in self.config.labeled_lists() {
            if self.shutdown.is_requested() {
                summary.interrupted = true;
                break;
            }

            info!(list = %label, url = %url, "Processing list");
            let scan = pager.scan(&url, &label, &self.shutdown).await?;
            summary.lists += 1;
            summary.pages += scan.pages;
            summary.records += scan.records.len();
            if scan.interrupted {
                summary.interrupted = true;
                break;
            }

            for record in select_best(scan.records) {
                if self.shutdown.is_requested() {
                    summary.interrupted = true;
                    return Ok(());
                }

                let change = self
                    .detector
                    .detect(state.state_mut(), &record, Utc::now());
                match change {
                    Change::New => summary.new += 1,
                    Change::Changed { .. } => summary.changed += 1,
                    Change::Unchanged => {
                        summary.unchanged += 1;
                        continue;
                    }
                }

                match dispatcher.dispatch(&record, state, Utc::now()).await? {
                    AlertOutcome::Sent { .. } => summary.alerts_sent += 1,
                    AlertOutcome::Suppressed { .. } => summary.alerts_suppressed += 1,
                    AlertOutcome::NoTemplate(_) | AlertOutcome::Disabled => {}
                }
            }
        }

        Ok(())
    }
}
