//! Crawler module for page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with rate-limit detection
//! - Page classification and record extraction
//! - Per-round URL frontiers
//! - Overall crawl orchestration

mod classifier;
mod engine;
mod fetcher;
mod frontier;

pub use classifier::{clean_answer, Classification, Classifier, SiteClassifier};
pub use engine::{CrawlEngine, CrawlResult, CrawlStatus, EngineConfig};
pub use fetcher::{build_http_client, FetchError, Fetcher, HttpFetcher};
pub use frontier::Frontier;

use crate::config::Config;
use crate::url::normalize_url;
use crate::HarvestError;
use tokio_util::sync::CancellationToken;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the HTTP fetcher and the page classifier
/// 2. Resume from the checkpoint if one exists, otherwise seed from `start_url`
/// 3. Crawl round by round until the frontier empties or `shutdown` is cancelled
/// 4. Write the records and remove the checkpoint on completion
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `config_hash` - Hash of the configuration file, stored in checkpoints
/// * `shutdown` - Cancelled to stop the crawl and save progress
pub async fn crawl(
    config: &Config,
    config_hash: Option<String>,
    shutdown: CancellationToken,
) -> Result<CrawlResult, HarvestError> {
    let seed = normalize_url(&config.crawler.start_url)?;

    let mut engine = CrawlEngine::from_config(config, config_hash)?.with_shutdown(shutdown);
    engine.run(vec![seed]).await
}
