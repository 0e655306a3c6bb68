//! Crawl engine
//!
//! The engine drives a crawl one locale at a time. Each round it draws a batch from the
//! frontier, fetches it through the scheduler, then applies every outcome to the crawl
//! state in a single sequential step. All state mutation happens in that step, so the
//! dedup check-then-commit and the frontier transitions never race.

use crate::crawler::{
    ExtractedLinks, FetchOutcome, FetchScheduler, LinkExtractor, LoadedPage, PageFetcher,
};
use crate::output::{export_html, CrawlStatistics};
use crate::state::{CrawlMode, CrawlState, DoneReason, EngineState};
use crate::storage::{CheckpointStore, JsonPageStore, PageRecord, PageStore};
use crate::url::canonicalize;
use crate::{ConfigError, LocusError, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, info_span, warn, Instrument, Span};

/// Stored pages between periodic checkpoints
pub const CHECKPOINT_INTERVAL: u64 = 1000;

/// Timing and persistence settings for the engine
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub navigation_timeout: Duration,
    pub load_timeout: Duration,

    /// Longest wait for in-flight fetches once a shutdown is requested
    pub grace_timeout: Duration,

    pub checkpoint_interval: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_millis(5000),
            load_timeout: Duration::from_millis(5000),
            grace_timeout: Duration::from_millis(10_000),
            checkpoint_interval: CHECKPOINT_INTERVAL,
        }
    }
}

/// What one round changed
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct RoundReport {
    stored: usize,
    newly_visited: usize,
    timed_out: usize,
    limit_reached: bool,
    checkpoint_due: bool,
}

impl RoundReport {
    /// A round that neither stored a page nor visited a new URL
    fn is_noop(&self) -> bool {
        self.stored == 0 && self.newly_visited == 0
    }
}

/// How a locale pass ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LocaleEnd {
    Exhausted,
    Stopped(DoneReason),
}

/// Orchestrates a crawl over a `CrawlState`
pub struct CrawlEngine {
    state: CrawlState,
    fetcher: Arc<dyn PageFetcher>,
    scheduler: FetchScheduler,
    extractor: LinkExtractor,
    checkpoints: CheckpointStore,
    pages: Box<dyn PageStore + Send>,
    rng: StdRng,
    shutdown: watch::Receiver<bool>,
    settings: EngineSettings,
    span: Span,
    phase: EngineState,
}

impl CrawlEngine {
    /// Creates an engine for the given state
    ///
    /// Pages are archived under the state's destination, and the checkpoint lives
    /// there too. Without [`with_shutdown`](Self::with_shutdown) the engine never
    /// sees an interrupt.
    ///
    /// # Arguments
    ///
    /// * `state` - A fresh, download or resumed crawl state
    /// * `fetcher` - The page fetcher sessions are opened on
    /// * `settings` - Deadlines and checkpoint interval
    pub fn new(
        state: CrawlState,
        fetcher: Arc<dyn PageFetcher>,
        settings: EngineSettings,
    ) -> Self {
        let scheduler = FetchScheduler::new(
            state.batch_size,
            settings.navigation_timeout,
            settings.load_timeout,
        );
        let extractor = LinkExtractor::new(state.host_filter());
        let checkpoints = CheckpointStore::in_dir(&state.destination);
        let pages = Box::new(JsonPageStore::new(&state.destination));
        let (_, shutdown) = watch::channel(false);

        Self {
            state,
            fetcher,
            scheduler,
            extractor,
            checkpoints,
            pages,
            rng: StdRng::from_os_rng(),
            shutdown,
            settings,
            span: info_span!("crawl"),
            phase: EngineState::Init,
        }
    }

    /// Stops the crawl once the channel carries `true`
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Runs the crawl inside `span`
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Replaces the batch sampling RNG
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Replaces the page archive
    pub fn with_page_store(mut self, pages: Box<dyn PageStore + Send>) -> Self {
        self.pages = pages;
        self
    }

    pub fn state(&self) -> &CrawlState {
        &self.state
    }

    pub fn phase(&self) -> &EngineState {
        &self.phase
    }

    /// Runs the crawl to a terminal state
    ///
    /// # Returns
    ///
    /// * `Ok(DoneReason)` - Why the crawl ended; export has run and the checkpoint is
    ///   saved (limit, interrupt) or removed (completion)
    /// * `Err(LocusError)` - Archive, checkpoint or export I/O failed
    pub async fn run(&mut self) -> Result<DoneReason> {
        let span = self.span.clone();
        self.run_inner().instrument(span).await
    }

    async fn run_inner(&mut self) -> Result<DoneReason> {
        if self.phase.is_terminal() {
            return Err(LocusError::InvalidTransition {
                from: self.phase.clone(),
                to: EngineState::Init,
            });
        }

        // A run that has stored nothing would number its pages from 1 again
        if self.state.stored_count == 0
            && JsonPageStore::new(&self.state.destination).has_records()?
        {
            return Err(ConfigError::DestinationInUse(self.state.destination.clone()).into());
        }

        std::fs::create_dir_all(&self.state.destination)?;

        info!(
            "Starting {} of {} seed(s) over locales [{}] into {}",
            self.state.mode,
            self.state.seed_urls.len(),
            self.state.locales.join(","),
            self.state.destination.display()
        );

        if self.state.limit_reached() {
            warn!(
                "Maximum number of {} pages was already reached, nothing to fetch",
                self.state.max_pages
            );
            self.finish(DoneReason::LimitReached)?;
            return Ok(DoneReason::LimitReached);
        }

        let reason = self.crawl_locales().await?;
        self.finish(reason)?;
        Ok(reason)
    }

    async fn crawl_locales(&mut self) -> Result<DoneReason> {
        loop {
            let locale = self.state.current_locale.clone();
            self.transition(EngineState::LocaleActive(locale.clone()))?;

            let span = info_span!("locale", locale = %locale);
            match self.crawl_locale(&locale).instrument(span).await? {
                LocaleEnd::Stopped(reason) => return Ok(reason),
                LocaleEnd::Exhausted => {
                    if !self.state.advance_locale() {
                        return Ok(DoneReason::Completed);
                    }
                }
            }
        }
    }

    async fn crawl_locale(&mut self, locale: &str) -> Result<LocaleEnd> {
        if self.state.frontier.is_exhausted(locale) {
            self.state.seed_locale(locale);
        } else if self.state.frontier.visited_len(locale) > 0 {
            info!("Resuming partial crawl...");
        }
        self.state.frontier.purge_visited(locale);

        info!("Starting with [{}] locale...", locale);

        loop {
            if *self.shutdown.borrow() {
                return Ok(LocaleEnd::Stopped(DoneReason::Interrupted));
            }

            if self.state.frontier.is_exhausted(locale) {
                return Ok(LocaleEnd::Exhausted);
            }

            let batch = self
                .state
                .frontier
                .draw_batch(locale, self.state.batch_size, &mut self.rng);

            let Some(outcomes) = self.fetch_or_interrupt(locale, &batch).await else {
                for url in &batch {
                    self.state.frontier.enqueue(locale, url);
                }
                return Ok(LocaleEnd::Stopped(DoneReason::Interrupted));
            };

            let report = self.process_batch(locale, outcomes)?;

            if report.limit_reached {
                warn!(
                    "Maximum number of {} pages has been reached",
                    self.state.max_pages
                );
                return Ok(LocaleEnd::Stopped(DoneReason::LimitReached));
            }

            if report.checkpoint_due {
                info!(
                    "Persisting the crawling state after {} stored pages",
                    self.state.stored_count
                );
                self.checkpoints.save(&self.state)?;
            }

            if report.is_noop() {
                self.state.frontier.purge_visited(locale);
                if self.state.frontier.is_exhausted(locale) {
                    return Ok(LocaleEnd::Exhausted);
                }

                self.state.no_progress_rounds += 1;
                let limit = self.state.max_no_progress_rounds;
                if limit > 0 && self.state.no_progress_rounds >= limit {
                    warn!(
                        "No progress in {} consecutive rounds, leaving {} URL(s) pending in [{}]",
                        self.state.no_progress_rounds,
                        self.state.frontier.pending_len(locale),
                        locale
                    );
                    return Ok(LocaleEnd::Exhausted);
                }
            } else {
                self.state.no_progress_rounds = 0;
            }

            info!(
                "Round done: {} stored, {} visited, {} timed out; {} pending, {} stored in total",
                report.stored,
                report.newly_visited,
                report.timed_out,
                self.state.frontier.pending_len(locale),
                self.state.stored_count
            );
        }
    }

    /// Fetches a batch unless a shutdown arrives first
    ///
    /// On shutdown the in-flight fetches get up to the grace timeout to settle, and
    /// their outcomes are dropped.
    async fn fetch_or_interrupt(
        &mut self,
        locale: &str,
        batch: &[String],
    ) -> Option<Vec<(String, FetchOutcome)>> {
        let fetcher = Arc::clone(&self.fetcher);
        let fetch = self.scheduler.fetch_batch(fetcher.as_ref(), locale, batch);
        tokio::pin!(fetch);

        let shutdown = &mut self.shutdown;
        tokio::select! {
            outcomes = &mut fetch => Some(outcomes),
            _ = wait_for_shutdown(shutdown) => {
                info!(
                    "Signal received: waiting up to {:?} for {} in-flight page(s)",
                    self.settings.grace_timeout,
                    batch.len()
                );
                if tokio::time::timeout(self.settings.grace_timeout, &mut fetch).await.is_err() {
                    warn!("In-flight pages did not settle, abandoning them");
                }
                None
            }
        }
    }

    /// Applies a batch's outcomes to the crawl state
    fn process_batch(
        &mut self,
        locale: &str,
        outcomes: Vec<(String, FetchOutcome)>,
    ) -> Result<RoundReport> {
        let mut report = RoundReport::default();
        let mut outcomes = outcomes.into_iter();

        while let Some((requested, outcome)) = outcomes.next() {
            match outcome {
                FetchOutcome::NavigationFailed => {
                    if self.state.frontier.mark_visited(locale, &requested) {
                        report.newly_visited += 1;
                    }
                }
                FetchOutcome::TimedOut => {
                    self.state.frontier.enqueue(locale, &requested);
                    report.timed_out += 1;
                }
                FetchOutcome::Loaded(page) => {
                    self.handle_loaded(locale, &requested, page, &mut report)?;
                }
            }

            if self.state.limit_reached() {
                report.limit_reached = true;
                for (unprocessed, _) in outcomes.by_ref() {
                    self.state.frontier.enqueue(locale, &unprocessed);
                }
                break;
            }
        }

        Ok(report)
    }

    fn handle_loaded(
        &mut self,
        locale: &str,
        requested: &str,
        page: LoadedPage,
        report: &mut RoundReport,
    ) -> Result<()> {
        let final_url = match canonicalize(&page.final_url) {
            Ok(url) => url,
            Err(e) => {
                debug!("Unusable final URL for {}: {}", requested, e);
                self.visit(locale, requested, report);
                return Ok(());
            }
        };

        if self.state.frontier.is_visited(locale, &final_url) {
            debug!("Already visited {}", final_url);
            self.visit(locale, requested, report);
            return Ok(());
        }

        let crawling = self.state.mode == CrawlMode::Crawl;

        if crawling && !self.extractor.filter().is_allowed(&final_url) {
            debug!(
                "Discarding {} (redirected off-site from {})",
                final_url, requested
            );
            self.visit(locale, requested, report);
            self.visit(locale, &final_url, report);
            return Ok(());
        }

        let Some(text) = page.visible_text.as_deref() else {
            warn!(
                "Could not read the body text of {}, skipping for now",
                final_url
            );
            self.state.frontier.enqueue(locale, requested);
            return Ok(());
        };

        let fingerprint = self.state.dedup.fingerprint(text);

        if crawling && self.state.dedup.is_duplicate(fingerprint) {
            debug!("Duplicate content at {} ({})", final_url, fingerprint);
            self.visit(locale, requested, report);
            self.visit(locale, &final_url, report);
            return Ok(());
        }

        let record = PageRecord {
            locale: locale.to_string(),
            url: final_url.clone(),
            raw_content: page.markup,
            content_hash: fingerprint,
        };

        let index = self.state.stored_count + 1;
        self.pages.store(index, &record)?;
        self.state.record_stored(locale, index);
        self.state.dedup.record(locale, fingerprint);
        report.stored += 1;

        info!("Storing URL {}", final_url);
        self.visit(locale, requested, report);
        self.visit(locale, &final_url, report);

        let interval = self.settings.checkpoint_interval;
        if interval > 0 && index % interval == 0 {
            report.checkpoint_due = true;
        }

        if self.state.limit_reached() || !crawling {
            return Ok(());
        }

        let ExtractedLinks { keep, discard } =
            self.extractor.extract(&final_url, &record.raw_content);

        for link in &discard {
            self.state.frontier.mark_visited(locale, link);
        }

        for link in &keep {
            self.state.frontier.enqueue(locale, link);
        }

        Ok(())
    }

    /// Marks a URL visited, counting it if it is new
    fn visit(&mut self, locale: &str, url: &str, report: &mut RoundReport) {
        if self.state.frontier.mark_visited(locale, url) {
            report.newly_visited += 1;
        }
    }

    /// Enters the terminal state and performs its side effects
    fn finish(&mut self, reason: DoneReason) -> Result<()> {
        self.transition(EngineState::Done(reason))?;

        if reason.is_resumable() {
            info!("Persisting crawler");
            self.checkpoints.save(&self.state)?;
        }

        info!("Crawling ends ({}). Generating HTML output", reason);
        let summary = export_html(&self.state.destination)?;
        info!(
            "Exported {} page(s) to {}",
            summary.pages,
            summary.index.display()
        );

        CrawlStatistics::from_state(&self.state).log();

        if reason == DoneReason::Completed && self.checkpoints.exists() {
            info!("Cleaning persistent crawler file");
            self.checkpoints.remove()?;
        }

        Ok(())
    }

    fn transition(&mut self, next: EngineState) -> Result<()> {
        if !self.phase.can_transition_to(&next, &self.state.locales) {
            return Err(LocusError::InvalidTransition {
                from: self.phase.clone(),
                to: next,
            });
        }

        debug!("Engine {} -> {}", self.phase, next);
        self.phase = next;
        Ok(())
    }
}

/// Resolves once the channel carries `true`; never resolves if the sender is gone
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
