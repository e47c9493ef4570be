//! In-memory site fixture shared by the engine integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use qa_harvest::checkpoint::CheckpointManager;
use qa_harvest::crawler::{Classification, Classifier, CrawlEngine, EngineConfig, FetchError, Fetcher};
use qa_harvest::output::JsonOutput;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use url::Url;

pub fn url(path: &str) -> Url {
    Url::parse(&format!("https://fixture.test/{}", path)).unwrap()
}

/// Page graph keyed by URL; pages not listed classify as Unknown
#[derive(Clone, Default)]
pub struct FixtureSite {
    pages: HashMap<String, Classification>,
}

impl FixtureSite {
    pub fn theme(mut self, path: &str, links: &[&str]) -> Self {
        self.pages.insert(
            url(path).to_string(),
            Classification::Theme {
                links: links.iter().map(|link| url(link)).collect(),
            },
        );
        self
    }

    pub fn question(mut self, path: &str, question: &str, answer: &str) -> Self {
        self.pages.insert(
            url(path).to_string(),
            Classification::Question {
                question: question.to_string(),
                answer: answer.to_string(),
            },
        );
        self
    }
}

impl Classifier for FixtureSite {
    fn classify(&self, body: &str) -> Classification {
        self.pages
            .get(body)
            .cloned()
            .unwrap_or(Classification::Unknown)
    }
}

/// Fetcher whose body is the URL itself, with an optional stop after N fetches
#[derive(Default)]
pub struct FixtureFetcher {
    fetched: Mutex<Vec<String>>,
    stop_after: Option<(usize, CancellationToken)>,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stopping_after(limit: usize, token: CancellationToken) -> Self {
        Self {
            fetched: Mutex::new(Vec::new()),
            stop_after: Some((limit, token)),
        }
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for FixtureFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        let count = {
            let mut fetched = self.fetched.lock().unwrap();
            fetched.push(url.to_string());
            fetched.len()
        };

        if let Some((limit, token)) = &self.stop_after {
            if count >= *limit {
                token.cancel();
            }
        }

        Ok(url.to_string())
    }
}

pub fn records_path(dir: &Path) -> std::path::PathBuf {
    dir.join("questions.json")
}

pub fn checkpoint_path(dir: &Path) -> std::path::PathBuf {
    dir.join("checkpoint.json")
}

/// Builds an engine writing JSON records and checkpoints into `dir`
pub fn build_engine(
    dir: &Path,
    fetcher: Arc<FixtureFetcher>,
    site: FixtureSite,
    workers: usize,
    shutdown: CancellationToken,
) -> CrawlEngine {
    CrawlEngine::new(
        fetcher,
        Arc::new(site),
        Box::new(JsonOutput::new(records_path(dir))),
        CheckpointManager::new(checkpoint_path(dir)),
        EngineConfig {
            workers,
            checkpoint_interval: 100,
            config_hash: None,
        },
    )
    .with_shutdown(shutdown)
}
