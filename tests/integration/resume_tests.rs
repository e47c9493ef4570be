//! Integration tests for interrupting and resuming crawls
//!
//! These tests drive the engine over an in-memory page graph so the exact set of
//! fetched pages can be compared across runs.

mod common;

use common::{build_engine, checkpoint_path, records_path, url, FixtureFetcher, FixtureSite};
use qa_harvest::checkpoint::{CheckpointError, CheckpointManager};
use qa_harvest::crawler::CrawlStatus;
use qa_harvest::output::{JsonOutput, OutputHandler};
use qa_harvest::state::RecordMap;
use qa_harvest::HarvestError;
use std::collections::HashSet;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// Root theme page linking to four questions
fn flat_site() -> FixtureSite {
    FixtureSite::default()
        .theme("content.html", &["q1.html", "q2.html", "q3.html", "q4.html"])
        .question("q1.html", "Q1", "A1")
        .question("q2.html", "Q2", "A2")
        .question("q3.html", "Q3", "A3")
        .question("q4.html", "Q4", "A4")
}

/// Nested themes with back links, shared questions and an unknown page
fn nested_site() -> FixtureSite {
    FixtureSite::default()
        .theme("content.html", &["topics/a.html", "topics/b.html", "q1.html"])
        .theme(
            "topics/a.html",
            &["content.html", "topics/b.html", "q1.html", "q2.html", "q3.html"],
        )
        .theme(
            "topics/b.html",
            &["topics/a.html", "q3.html", "q4.html", "topics/c.html", "about.html"],
        )
        .theme("topics/c.html", &["q5.html", "q6.html", "q1.html"])
        .question("q1.html", "Q1", "A1")
        .question("q2.html", "Q2", "A2")
        .question("q3.html", "Q3", "A3")
        .question("q4.html", "Q4", "A4")
        .question("q5.html", "Q5", "A5")
        .question("q6.html", "Q6", "A6")
}

fn load_records(dir: &TempDir) -> RecordMap {
    JsonOutput::new(records_path(dir.path()))
        .load_records()
        .expect("Failed to read records")
        .expect("Records file missing")
}

/// Runs `site` to completion in a fresh directory and returns the records
async fn uninterrupted(site: FixtureSite) -> RecordMap {
    let dir = TempDir::new().unwrap();
    let mut engine = build_engine(
        dir.path(),
        Arc::new(FixtureFetcher::new()),
        site,
        4,
        CancellationToken::new(),
    );
    let result = engine.run(vec![url("content.html")]).await.unwrap();
    assert_eq!(result.status, CrawlStatus::Completed);
    load_records(&dir)
}

#[tokio::test]
async fn test_interrupt_and_resume_without_refetching() {
    let dir = TempDir::new().unwrap();

    // First run stops after two pages: the root and one question
    let token = CancellationToken::new();
    let first = Arc::new(FixtureFetcher::stopping_after(2, token.clone()));
    let mut engine = build_engine(dir.path(), first.clone(), flat_site(), 1, token);
    let result = engine.run(vec![url("content.html")]).await.unwrap();

    assert_eq!(result.status, CrawlStatus::Interrupted);
    assert_eq!(result.records, 1);
    assert_eq!(result.pending, 3);
    assert_eq!(first.fetched().len(), 2);

    let checkpoint = CheckpointManager::new(checkpoint_path(dir.path()))
        .load()
        .unwrap()
        .expect("Checkpoint should exist after an interrupt");
    assert_eq!(checkpoint.record_count, 1);
    assert_eq!(checkpoint.theme_links.len(), 1);
    assert_eq!(checkpoint.question_links.len(), 1);
    assert_eq!(checkpoint.pending_urls.len(), 3);
    assert_eq!(load_records(&dir).len(), 1);

    // Second run picks up the remaining three
    let second = Arc::new(FixtureFetcher::new());
    let mut engine = build_engine(
        dir.path(),
        second.clone(),
        flat_site(),
        1,
        CancellationToken::new(),
    );
    let result = engine.run(vec![url("content.html")]).await.unwrap();

    assert_eq!(result.status, CrawlStatus::Completed);
    assert_eq!(result.records, 4);
    assert_eq!(second.fetched().len(), 3);

    let first_fetched: HashSet<String> = first.fetched().into_iter().collect();
    for page in second.fetched() {
        assert!(!first_fetched.contains(&page), "{} fetched twice", page);
    }

    assert_eq!(load_records(&dir), uninterrupted(flat_site()).await);
    assert!(!checkpoint_path(dir.path()).exists());
}

#[tokio::test]
async fn test_repeated_interrupts_visit_each_page_once() {
    let dir = TempDir::new().unwrap();
    let mut all_fetched = Vec::new();
    let mut runs = 0;

    loop {
        runs += 1;
        assert!(runs <= 20, "crawl did not converge");

        let token = CancellationToken::new();
        let fetcher = Arc::new(FixtureFetcher::stopping_after(1, token.clone()));
        let mut engine = build_engine(dir.path(), fetcher.clone(), nested_site(), 1, token);
        let result = engine.run(vec![url("content.html")]).await.unwrap();

        all_fetched.extend(fetcher.fetched());
        if result.status == CrawlStatus::Completed {
            break;
        }
    }

    let unique: HashSet<&String> = all_fetched.iter().collect();
    assert_eq!(unique.len(), all_fetched.len(), "a page was fetched twice");

    // 4 themes, 6 questions, 1 unknown page
    assert_eq!(all_fetched.len(), 11);
    assert_eq!(load_records(&dir), uninterrupted(nested_site()).await);
}

#[tokio::test]
async fn test_worker_count_does_not_change_results() {
    let mut outcomes = Vec::new();

    for workers in [1, 20] {
        let dir = TempDir::new().unwrap();
        let mut engine = build_engine(
            dir.path(),
            Arc::new(FixtureFetcher::new()),
            nested_site(),
            workers,
            CancellationToken::new(),
        );
        let result = engine.run(vec![url("content.html")]).await.unwrap();
        assert_eq!(result.status, CrawlStatus::Completed);

        let snapshot = engine.store().snapshot();
        outcomes.push((
            load_records(&dir),
            snapshot.theme_visited,
            snapshot.question_visited,
        ));
    }

    assert_eq!(outcomes[0], outcomes[1]);

    let (records, themes, questions) = &outcomes[0];
    assert_eq!(records.len(), 6);
    assert_eq!(themes.len(), 4);
    assert_eq!(questions.len(), 6);
}

#[tokio::test]
async fn test_corrupt_checkpoint_is_fatal() {
    let dir = TempDir::new().unwrap();
    std::fs::write(checkpoint_path(dir.path()), "{not json").unwrap();

    let fetcher = Arc::new(FixtureFetcher::new());
    let mut engine = build_engine(
        dir.path(),
        fetcher.clone(),
        flat_site(),
        4,
        CancellationToken::new(),
    );
    let result = engine.run(vec![url("content.html")]).await;

    assert!(matches!(
        result,
        Err(HarvestError::Checkpoint(CheckpointError::Corrupt { .. }))
    ));
    assert!(fetcher.fetched().is_empty());

    // The corrupt file is left for inspection
    assert!(checkpoint_path(dir.path()).exists());
}

#[tokio::test]
async fn test_resume_with_missing_records_file() {
    let dir = TempDir::new().unwrap();

    let token = CancellationToken::new();
    let first = Arc::new(FixtureFetcher::stopping_after(2, token.clone()));
    let mut engine = build_engine(dir.path(), first.clone(), flat_site(), 1, token);
    engine.run(vec![url("content.html")]).await.unwrap();

    std::fs::remove_file(records_path(dir.path())).unwrap();

    let second = Arc::new(FixtureFetcher::new());
    let mut engine = build_engine(
        dir.path(),
        second.clone(),
        flat_site(),
        1,
        CancellationToken::new(),
    );
    let result = engine.run(vec![url("content.html")]).await.unwrap();

    // The question harvested before the interrupt is fetched again to rebuild its record
    assert_eq!(result.status, CrawlStatus::Completed);
    assert_eq!(result.records, 4);
    assert_eq!(second.fetched().len(), 4);
    assert!(!second.fetched().contains(&url("content.html").to_string()));
    assert_eq!(load_records(&dir), uninterrupted(flat_site()).await);
}
