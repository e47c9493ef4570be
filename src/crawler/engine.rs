//! Crawl engine - round-based crawl orchestration
//!
//! This module contains the main crawl loop, including:
//! - Restoring state from a checkpoint or seeding a fresh frontier
//! - Dispatching each round's URLs across a bounded pool of worker tasks
//! - Merging discovered and rate-limited URLs into the next round's frontier
//! - Periodic checkpoints and graceful stop
//! - Writing the final record set

use crate::checkpoint::{Checkpoint, CheckpointManager};
use crate::config::Config;
use crate::crawler::classifier::{Classification, Classifier, SiteClassifier};
use crate::crawler::fetcher::{FetchError, Fetcher, HttpFetcher};
use crate::crawler::frontier::Frontier;
use crate::output::{build_output_handler, CrawlStatistics, OutputHandler};
use crate::state::{PageKind, PageStore, Record, RecordMap};
use crate::url::normalize_url;
use crate::HarvestError;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

/// Tunables of the crawl engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum number of concurrent page tasks
    pub workers: usize,

    /// Completed tasks between checkpoints
    pub checkpoint_interval: usize,

    /// Hash of the configuration file, stored in checkpoints
    pub config_hash: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: 8,
            checkpoint_interval: 100,
            config_hash: None,
        }
    }
}

impl EngineConfig {
    pub fn from_config(config: &Config, config_hash: Option<String>) -> Self {
        Self {
            workers: config.crawler.workers.max(1),
            checkpoint_interval: config.crawler.checkpoint_interval.max(1),
            config_hash,
        }
    }
}

/// How a crawl run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlStatus {
    /// The frontier emptied; records written and checkpoint removed
    Completed,

    /// A stop was requested; progress saved to the checkpoint
    Interrupted,
}

/// Summary of one crawl run
#[derive(Debug, Clone)]
pub struct CrawlResult {
    pub status: CrawlStatus,

    /// Records held at the end of the run, including resumed ones
    pub records: usize,

    pub theme_pages: usize,

    pub question_pages: usize,

    /// URLs left for a later run (zero when completed)
    pub pending: usize,

    pub stats: CrawlStatistics,
}

#[derive(Debug)]
enum DropReason {
    Fetch(FetchError),
    Unknown,
    Extraction,
}

/// What a single page task produced
#[derive(Debug)]
enum TaskOutcome {
    /// Newly visited theme page and its not-yet-known links
    Discovered(Vec<Url>),

    /// Newly visited question page with a stored record
    Harvested,

    /// Rate limited; try again next round
    Retry,

    /// Never started because a stop was requested
    Deferred,

    /// Another task already claimed this page
    Skipped,

    Dropped(DropReason),
}

struct TaskResult {
    url: Url,
    outcome: TaskOutcome,
}

/// Main crawl engine
pub struct CrawlEngine {
    fetcher: Arc<dyn Fetcher>,
    classifier: Arc<dyn Classifier>,
    store: Arc<PageStore>,
    output: Box<dyn OutputHandler>,
    checkpoints: CheckpointManager,
    config: EngineConfig,
    shutdown: CancellationToken,
    completed_tasks: u64,
}

impl CrawlEngine {
    /// Creates a new engine with an empty page store
    ///
    /// A zero worker count or checkpoint interval is raised to one.
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        classifier: Arc<dyn Classifier>,
        output: Box<dyn OutputHandler>,
        checkpoints: CheckpointManager,
        mut config: EngineConfig,
    ) -> Self {
        if config.workers == 0 {
            warn!("Worker count of 0 raised to 1");
            config.workers = 1;
        }
        if config.checkpoint_interval == 0 {
            warn!("Checkpoint interval of 0 raised to 1");
            config.checkpoint_interval = 1;
        }

        Self {
            fetcher,
            classifier,
            store: Arc::new(PageStore::new()),
            output,
            checkpoints,
            config,
            shutdown: CancellationToken::new(),
            completed_tasks: 0,
        }
    }

    /// Creates an engine that fetches over HTTP and classifies with the site selectors
    pub fn from_config(config: &Config, config_hash: Option<String>) -> Result<Self, HarvestError> {
        let fetcher = HttpFetcher::from_config(config)?;
        let classifier = SiteClassifier::from_config(config)?;

        Ok(Self::new(
            Arc::new(fetcher),
            Arc::new(classifier),
            build_output_handler(&config.output),
            CheckpointManager::new(&config.output.checkpoint_path),
            EngineConfig::from_config(config, config_hash),
        ))
    }

    /// Replaces the stop signal with an externally owned token
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Token that stops the crawl at the end of the current round when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// The page store of the current run
    pub fn store(&self) -> Arc<PageStore> {
        Arc::clone(&self.store)
    }

    /// Runs the crawl until the frontier empties or a stop is requested
    ///
    /// If a checkpoint exists, its state and pending URLs are restored and `seeds` is
    /// ignored. Otherwise the crawl starts from `seeds`.
    ///
    /// # Errors
    ///
    /// Only startup problems (corrupt checkpoint, unreadable records) and a failure to
    /// write the final records are errors. Per-page failures are logged and counted.
    pub async fn run(&mut self, seeds: Vec<Url>) -> Result<CrawlResult, HarvestError> {
        let start_time = Instant::now();
        let mut stats = CrawlStatistics::default();
        let mut frontier = self.restore(seeds)?;

        let status = loop {
            let skipped = frontier.discard_known(&self.store);
            if skipped > 0 {
                debug!("Skipped {} already visited URLs", skipped);
            }

            if frontier.is_empty() {
                info!("Frontier is empty, crawl complete");
                break CrawlStatus::Completed;
            }

            stats.rounds += 1;
            info!("Round {}: crawling {} pages", stats.rounds, frontier.len());

            let mut next = self.run_round(frontier, &mut stats).await;
            next.discard_known(&self.store);

            info!(
                "Round {} finished: {} URLs queued, {} records, {:.2} pages/sec",
                stats.rounds,
                next.len(),
                self.store.record_count(),
                stats.pages_fetched as f64 / start_time.elapsed().as_secs_f64().max(0.001)
            );

            if self.shutdown.is_cancelled() && !next.is_empty() {
                warn!("Stop requested, saving progress with {} URLs pending", next.len());
                self.write_checkpoint(next.to_strings(), &HashSet::new());
                frontier = next;
                break CrawlStatus::Interrupted;
            }

            frontier = next;
        };

        stats.elapsed = start_time.elapsed();

        let pending = match status {
            CrawlStatus::Completed => {
                self.store.flush(self.output.as_ref())?;
                info!(
                    "Wrote {} records to {}",
                    self.store.record_count(),
                    self.output.describe()
                );
                if let Err(e) = self.checkpoints.delete() {
                    warn!("Failed to remove checkpoint: {}", e);
                }
                0
            }
            CrawlStatus::Interrupted => frontier.len(),
        };

        stats.log_summary(self.store.record_count());

        Ok(CrawlResult {
            status,
            records: self.store.record_count(),
            theme_pages: self.store.theme_count(),
            question_pages: self.store.question_count(),
            pending,
            stats,
        })
    }

    /// Restores the store and frontier from a checkpoint, or seeds a fresh crawl
    fn restore(&mut self, seeds: Vec<Url>) -> Result<Frontier, HarvestError> {
        let Some(checkpoint) = self.checkpoints.load()? else {
            info!("No checkpoint found, starting from {} seed URLs", seeds.len());
            return Ok(Frontier::from_urls(seeds));
        };

        let records = match self.output.load_records()? {
            Some(records) => records,
            None => {
                warn!(
                    "Checkpoint present but no records at {}; starting with an empty record set",
                    self.output.describe()
                );
                RecordMap::new()
            }
        };

        if records.len() != checkpoint.record_count {
            warn!(
                "Checkpoint lists {} records but {} were loaded",
                checkpoint.record_count,
                records.len()
            );
        }

        if let (Some(saved), Some(current)) = (&checkpoint.config_hash, &self.config.config_hash) {
            if saved != current {
                warn!("Configuration changed since the checkpoint was written");
            }
        }

        let mut snapshot = checkpoint.to_store_snapshot(records);

        // Question pages whose records did not survive are fetched again
        let unrecorded: Vec<String> = snapshot
            .question_visited
            .iter()
            .filter(|url| !snapshot.records.contains_key(url.as_str()))
            .cloned()
            .collect();
        if !unrecorded.is_empty() {
            warn!(
                "{} visited question pages have no stored record and will be fetched again",
                unrecorded.len()
            );
        }

        let mut frontier = Frontier::new();
        for raw in checkpoint.pending_urls.iter().chain(&unrecorded) {
            match normalize_url(raw) {
                Ok(url) => {
                    frontier.push(url);
                }
                Err(e) => warn!("Ignoring invalid pending URL {}: {}", raw, e),
            }
        }

        for url in &unrecorded {
            snapshot.question_visited.remove(url);
        }
        self.store = Arc::new(PageStore::restore(snapshot));

        info!(
            "Resuming crawl: {} records, {} theme pages, {} question pages, {} pending URLs",
            self.store.record_count(),
            self.store.theme_count(),
            self.store.question_count(),
            frontier.len()
        );

        Ok(frontier)
    }

    /// Fetches and classifies every URL of one round, returning the next frontier
    async fn run_round(&mut self, frontier: Frontier, stats: &mut CrawlStatistics) -> Frontier {
        let semaphore = Arc::new(Semaphore::new(self.config.workers));
        let mut in_flight: HashSet<String> = HashSet::with_capacity(frontier.len());
        let mut tasks = JoinSet::new();

        for url in frontier.into_urls() {
            in_flight.insert(url.as_str().to_string());

            let fetcher = Arc::clone(&self.fetcher);
            let classifier = Arc::clone(&self.classifier);
            let store = Arc::clone(&self.store);
            let semaphore = Arc::clone(&semaphore);
            let shutdown = self.shutdown.clone();

            tasks.spawn(async move {
                let permit = tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => None,
                    permit = semaphore.acquire_owned() => permit.ok(),
                };

                let outcome = match permit {
                    Some(_permit) => {
                        process_url(&url, fetcher.as_ref(), classifier.as_ref(), &store).await
                    }
                    None => TaskOutcome::Deferred,
                };

                TaskResult { url, outcome }
            });
        }

        let mut next = Frontier::new();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => {
                    in_flight.remove(result.url.as_str());
                    record_outcome(result, &mut next, stats);
                }
                Err(e) => {
                    stats.task_panics += 1;
                    error!("Worker task failed: {}", e);
                }
            }

            self.completed_tasks += 1;
            if self.completed_tasks % self.config.checkpoint_interval as u64 == 0 {
                info!(
                    "Checkpoint: {} pages crawled, {} records found",
                    self.completed_tasks,
                    self.store.record_count()
                );
                let pending = pending_urls(&next, &in_flight);
                self.write_checkpoint(pending, &in_flight);
            }
        }

        // Whatever is left belongs to tasks that panicked
        for url in in_flight {
            warn!("Dropping {} after worker failure", url);
            self.store.mark_dropped(&url);
        }

        next
    }

    /// Writes records and then the checkpoint
    ///
    /// URLs in `unfinished` have not reported back yet; they are left out of the visited
    /// and dropped sets so a resumed run fetches them again. Failures are logged and the
    /// crawl continues.
    fn write_checkpoint(&self, mut pending: Vec<String>, unfinished: &HashSet<String>) {
        pending.sort();

        let mut snapshot = self.store.snapshot();
        for url in unfinished {
            snapshot.theme_visited.remove(url);
            snapshot.question_visited.remove(url);
            snapshot.dropped.remove(url);
        }

        // A checkpoint must never reference records that were not written
        if let Err(e) = self.output.write_records(&snapshot.records) {
            error!(
                "Failed to write records to {}, checkpoint skipped: {}",
                self.output.describe(),
                e
            );
            return;
        }

        let checkpoint =
            Checkpoint::from_snapshot(&snapshot, pending, self.config.config_hash.clone());
        if let Err(e) = self.checkpoints.save(&checkpoint) {
            error!(
                "Failed to write checkpoint {}: {}",
                self.checkpoints.path().display(),
                e
            );
        }
    }
}

/// Next-round URLs followed by the current round's unfinished ones, without duplicates
fn pending_urls(next: &Frontier, in_flight: &HashSet<String>) -> Vec<String> {
    let mut pending = next.to_strings();
    pending.extend(
        in_flight
            .iter()
            .filter(|url| !next.contains(url.as_str()))
            .cloned(),
    );
    pending
}

/// Fetches one URL, classifies it and updates the store
async fn process_url(
    url: &Url,
    fetcher: &dyn Fetcher,
    classifier: &dyn Classifier,
    store: &PageStore,
) -> TaskOutcome {
    let body = match fetcher.fetch(url).await {
        Ok(body) => body,
        Err(e) if e.is_retriable() => {
            debug!("{} on {}, retrying next round", e, url);
            return TaskOutcome::Retry;
        }
        Err(e) => {
            warn!("Failed to crawl page {}: {}", url, e);
            store.mark_dropped(url.as_str());
            return TaskOutcome::Dropped(DropReason::Fetch(e));
        }
    };

    match classifier.classify(&body) {
        Classification::Theme { links } => {
            debug!("Discovered theme page: {}", url);
            if !store.mark_visited(url.as_str(), PageKind::Theme) {
                return TaskOutcome::Skipped;
            }

            let fresh = links
                .into_iter()
                .filter(|link| !store.is_known(link.as_str()))
                .collect();
            TaskOutcome::Discovered(fresh)
        }
        Classification::Question { question, answer } => {
            debug!("Discovered question page: {}", url);
            if !store.mark_visited(url.as_str(), PageKind::Question) {
                return TaskOutcome::Skipped;
            }

            let record = Record::new(question, answer);
            if !record.is_complete() {
                warn!("Question page {} is missing its question or answer", url);
                return TaskOutcome::Dropped(DropReason::Extraction);
            }

            store.put_record(url.as_str(), record.question, record.answer);
            TaskOutcome::Harvested
        }
        Classification::Unknown => {
            debug!("Unclassified page: {}", url);
            store.mark_dropped(url.as_str());
            TaskOutcome::Dropped(DropReason::Unknown)
        }
    }
}

/// Folds one task result into the next frontier and the statistics
fn record_outcome(result: TaskResult, next: &mut Frontier, stats: &mut CrawlStatistics) {
    let TaskResult { url, outcome } = result;

    match outcome {
        TaskOutcome::Discovered(links) => {
            stats.pages_fetched += 1;
            stats.theme_pages += 1;
            debug!("{} yielded {} new links", url, links.len());
            next.extend(links);
        }
        TaskOutcome::Harvested => {
            stats.pages_fetched += 1;
            stats.question_pages += 1;
            stats.records_harvested += 1;
        }
        TaskOutcome::Retry => {
            stats.rate_limited += 1;
            next.push(url);
        }
        TaskOutcome::Deferred => {
            stats.deferred += 1;
            next.push(url);
        }
        TaskOutcome::Skipped => {
            stats.pages_fetched += 1;
            stats.duplicates_skipped += 1;
        }
        TaskOutcome::Dropped(DropReason::Fetch(_)) => {
            stats.fetch_failures += 1;
        }
        TaskOutcome::Dropped(DropReason::Unknown) => {
            stats.pages_fetched += 1;
            stats.unknown_pages += 1;
        }
        TaskOutcome::Dropped(DropReason::Extraction) => {
            stats.pages_fetched += 1;
            stats.question_pages += 1;
            stats.extraction_failures += 1;
        }
    }
}
