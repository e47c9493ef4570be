//! Crawl statistics
//!
//! Counters accumulated by the crawl engine as round results are joined, and the
//! end-of-run report built from them.

use std::time::Duration;

/// Crawl statistics summary
#[derive(Debug, Clone, Default)]
pub struct CrawlStatistics {
    /// Number of rounds executed in this process
    pub rounds: usize,

    /// Pages fetched successfully
    pub pages_fetched: u64,

    /// Pages classified as theme pages (newly visited)
    pub theme_pages: u64,

    /// Pages classified as question pages (newly visited)
    pub question_pages: u64,

    /// Records stored in this process
    pub records_harvested: u64,

    /// Fetches answered with HTTP 429 and re-queued
    pub rate_limited: u64,

    /// Fetches that failed permanently
    pub fetch_failures: u64,

    /// Pages whose classification was Unknown
    pub unknown_pages: u64,

    /// Question pages without usable question or answer text
    pub extraction_failures: u64,

    /// Pages another worker had already claimed
    pub duplicates_skipped: u64,

    /// Worker tasks that panicked
    pub task_panics: u64,

    /// Tasks returned unstarted because a stop was requested
    pub deferred: u64,

    /// Wall-clock time of the run
    pub elapsed: Duration,
}

impl CrawlStatistics {
    /// Logs a one-line summary at info level
    pub fn log_summary(&self, total_records: usize) {
        tracing::info!(
            "Crawled {} pages in {} rounds ({} theme, {} question), {} records total, {} rate limited, {} failed, {:?} elapsed",
            self.pages_fetched,
            self.rounds,
            self.theme_pages,
            self.question_pages,
            total_records,
            self.rate_limited,
            self.fetch_failures,
            self.elapsed
        );
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics, total_records: usize) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Rounds: {}", stats.rounds);
    println!("  Pages fetched: {}", stats.pages_fetched);
    println!("  Theme pages: {}", stats.theme_pages);
    println!("  Question pages: {}", stats.question_pages);
    println!(
        "  Records: {} ({} harvested this run)",
        total_records, stats.records_harvested
    );
    println!("  Elapsed: {:.1}s", stats.elapsed.as_secs_f64());
    println!();

    let problems = [
        ("Rate limited (retried)", stats.rate_limited),
        ("Fetch failures", stats.fetch_failures),
        ("Unknown pages", stats.unknown_pages),
        ("Extraction failures", stats.extraction_failures),
        ("Task panics", stats.task_panics),
        ("Deferred by stop", stats.deferred),
    ];

    if problems.iter().any(|(_, count)| *count > 0) {
        println!("Problems:");
        for (label, count) in problems.iter().filter(|(_, count)| *count > 0) {
            println!("  {}: {}", label, count);
        }
        println!();
    }

    let rate = if stats.elapsed.as_secs_f64() > 0.0 {
        stats.pages_fetched as f64 / stats.elapsed.as_secs_f64()
    } else {
        0.0
    };
    println!("Throughput: {:.2} pages/sec", rate);
}
