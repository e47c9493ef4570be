//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use qa_harvest::checkpoint::{Checkpoint, CheckpointManager};
use qa_harvest::config::{Config, OutputFormat};
use qa_harvest::crawler::{crawl, CrawlStatus};
use qa_harvest::output::{JsonOutput, OutputHandler, SqliteOutput};
use qa_harvest::state::Record;
use std::collections::BTreeMap;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(server: &MockServer, dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.crawler.base_url = format!("{}/", server.uri());
    config.crawler.start_url = format!("{}/content.html", server.uri());
    config.crawler.workers = 4;
    config.crawler.request_timeout_secs = 5;
    config.user_agent.crawler_name = "TestBot".to_string();
    config.user_agent.crawler_version = "1.0".to_string();
    config.user_agent.contact_url = None;
    config.output.records_path = dir
        .path()
        .join("questions.json")
        .to_string_lossy()
        .to_string();
    config.output.checkpoint_path = dir
        .path()
        .join("checkpoint.json")
        .to_string_lossy()
        .to_string();
    config
}

fn theme_page(links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">{}</a>"#, href, href))
        .collect();
    format!(
        r#"<html><body>
        <div class="label gradient-to-tr">Theme</div>
        <div class="content">{}</div>
        </body></html>"#,
        anchors
    )
}

fn question_page(question: &str, answer: &str) -> String {
    format!(
        r#"<html><body>
        <div class="label gradient-to-tr">Question</div>
        <h1><span itemprop="name headline" property="og:title">{}</span></h1>
        <div itemprop="articleBody"><span>Answer</span> {}</div>
        </body></html>"#,
        question, answer
    )
}

async fn mount_page(server: &MockServer, page: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

fn load_json_records(config: &Config) -> BTreeMap<String, Record> {
    JsonOutput::new(&config.output.records_path)
        .load_records()
        .expect("Failed to read records")
        .expect("Records file missing")
}

#[tokio::test]
async fn test_full_crawl_single_site() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server, &dir);
    let base = mock_server.uri();

    mount_page(
        &mock_server,
        "/content.html",
        theme_page(&[
            "grace.html",
            "about.html",
            "gone.html",
            "busy.html",
            "https://elsewhere.example.com/external.html",
        ]),
    )
    .await;
    mount_page(
        &mock_server,
        "/grace.html",
        question_page("What is grace?", "Unmerited favor."),
    )
    .await;
    mount_page(
        &mock_server,
        "/about.html",
        "<html><body><p>About us</p></body></html>".to_string(),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/gone.html"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    // First request is rate limited, the retry next round succeeds
    Mock::given(method("GET"))
        .and(path("/busy.html"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    mount_page(
        &mock_server,
        "/busy.html",
        question_page("Why wait?", "Patience."),
    )
    .await;

    let result = crawl(&config, None, CancellationToken::new())
        .await
        .expect("Crawl failed");

    assert_eq!(result.status, CrawlStatus::Completed);
    assert_eq!(result.records, 2);
    assert_eq!(result.theme_pages, 1);
    assert_eq!(result.question_pages, 2);
    assert_eq!(result.stats.rate_limited, 1);
    assert_eq!(result.stats.fetch_failures, 1);
    assert_eq!(result.stats.unknown_pages, 1);
    assert_eq!(result.stats.rounds, 3);

    let records = load_json_records(&config);
    assert_eq!(records.len(), 2);
    assert_eq!(
        records.get(&format!("{}/grace.html", base)),
        Some(&Record::new("What is grace?", "Unmerited favor."))
    );
    assert_eq!(
        records.get(&format!("{}/busy.html", base)),
        Some(&Record::new("Why wait?", "Patience."))
    );
    assert!(!records.contains_key(&format!("{}/about.html", base)));

    // Checkpoint is removed after a completed crawl
    assert!(!CheckpointManager::new(&config.output.checkpoint_path).exists());
}

#[tokio::test]
async fn test_user_agent_is_sent() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server, &dir);

    Mock::given(method("GET"))
        .and(path("/content.html"))
        .and(header("user-agent", "TestBot/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(theme_page(&[])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = crawl(&config, None, CancellationToken::new())
        .await
        .expect("Crawl failed");

    assert_eq!(result.theme_pages, 1);
    assert_eq!(result.records, 0);
}

#[tokio::test]
async fn test_links_form_cycles() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server, &dir);

    // Two theme pages linking to each other and to the same question
    Mock::given(method("GET"))
        .and(path("/content.html"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(theme_page(&["topics.html", "q.html"])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/topics.html"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(theme_page(&["content.html", "q.html"])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/q.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(question_page("Q", "A")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = crawl(&config, None, CancellationToken::new())
        .await
        .expect("Crawl failed");

    assert_eq!(result.status, CrawlStatus::Completed);
    assert_eq!(result.theme_pages, 2);
    assert_eq!(result.records, 1);
}

#[tokio::test]
async fn test_sqlite_output() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&mock_server, &dir);
    config.output.format = OutputFormat::Sqlite;
    config.output.records_path = dir
        .path()
        .join("questions.db")
        .to_string_lossy()
        .to_string();

    mount_page(&mock_server, "/content.html", theme_page(&["q1.html", "q2.html"])).await;
    mount_page(&mock_server, "/q1.html", question_page("Q1", "A1")).await;
    mount_page(&mock_server, "/q2.html", question_page("Q2", "A2")).await;

    let result = crawl(&config, None, CancellationToken::new())
        .await
        .expect("Crawl failed");
    assert_eq!(result.records, 2);

    let records = SqliteOutput::new(&config.output.records_path)
        .load_records()
        .unwrap()
        .unwrap();
    assert_eq!(
        records.get(&format!("{}/q1.html", mock_server.uri())),
        Some(&Record::new("Q1", "A1"))
    );
    assert_eq!(records.len(), 2);
}

#[tokio::test]
async fn test_resume_skips_visited_pages() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server, &dir);
    let base = mock_server.uri();

    // State left behind by an interrupted run: the root and q1 are done, q2 is pending
    let mut previous = BTreeMap::new();
    previous.insert(format!("{}/q1.html", base), Record::new("Q1", "A1"));
    JsonOutput::new(&config.output.records_path)
        .write_records(&previous)
        .unwrap();

    let mut checkpoint = Checkpoint::default();
    checkpoint.record_count = 1;
    checkpoint
        .theme_links
        .insert(format!("{}/content.html", base));
    checkpoint
        .question_links
        .insert(format!("{}/q1.html", base));
    checkpoint.pending_urls = vec![format!("{}/q2.html", base)];
    CheckpointManager::new(&config.output.checkpoint_path)
        .save(&checkpoint)
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/content.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(theme_page(&["q1.html"])))
        .expect(0)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/q1.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(question_page("Q1", "A1")))
        .expect(0)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/q2.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(question_page("Q2", "A2")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = crawl(&config, None, CancellationToken::new())
        .await
        .expect("Crawl failed");

    assert_eq!(result.status, CrawlStatus::Completed);
    assert_eq!(result.records, 2);

    let records = load_json_records(&config);
    assert_eq!(
        records.get(&format!("{}/q1.html", base)),
        Some(&Record::new("Q1", "A1"))
    );
    assert_eq!(
        records.get(&format!("{}/q2.html", base)),
        Some(&Record::new("Q2", "A2"))
    );
    assert!(!CheckpointManager::new(&config.output.checkpoint_path).exists());
}

#[tokio::test]
async fn test_unreachable_start_page_completes_empty() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server, &dir);

    Mock::given(method("GET"))
        .and(path("/content.html"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = crawl(&config, None, CancellationToken::new())
        .await
        .expect("Crawl failed");

    assert_eq!(result.status, CrawlStatus::Completed);
    assert_eq!(result.records, 0);
    assert_eq!(result.stats.fetch_failures, 1);
    assert!(load_json_records(&config).is_empty());
}
