//! Thread-safe store of visited pages and harvested records
//!
//! The store is shared by every worker task of a crawl. All mutations go through a single
//! mutex, and membership checks are folded into the insert that follows them so two
//! workers racing on the same URL can never both claim it.

use crate::output::{OutputHandler, OutputResult};
use crate::state::PageKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A harvested question/answer pair
///
/// Serialized as a two-element array `[question, answer]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct Record {
    pub question: String,
    pub answer: String,
}

impl Record {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }

    /// Returns true if both fields carry text
    pub fn is_complete(&self) -> bool {
        !self.question.is_empty() && !self.answer.is_empty()
    }
}

impl From<(String, String)> for Record {
    fn from((question, answer): (String, String)) -> Self {
        Self { question, answer }
    }
}

impl From<Record> for (String, String) {
    fn from(record: Record) -> Self {
        (record.question, record.answer)
    }
}

/// Records keyed by source URL, ordered for stable output
pub type RecordMap = BTreeMap<String, Record>;

/// Point-in-time copy of the store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub theme_visited: BTreeSet<String>,
    pub question_visited: BTreeSet<String>,
    pub dropped: BTreeSet<String>,
    pub records: RecordMap,
}

#[derive(Debug, Default)]
struct StoreInner {
    theme_visited: HashSet<String>,
    question_visited: HashSet<String>,
    dropped: HashSet<String>,
    records: HashMap<String, Record>,
}

impl StoreInner {
    fn is_visited(&self, url: &str) -> bool {
        self.theme_visited.contains(url) || self.question_visited.contains(url)
    }
}

/// Shared crawl state: visited sets, permanently dropped URLs and records
#[derive(Debug, Default)]
pub struct PageStore {
    inner: Mutex<StoreInner>,
}

impl PageStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a store from a snapshot taken by a previous run
    pub fn restore(snapshot: StoreSnapshot) -> Self {
        let inner = StoreInner {
            theme_visited: snapshot.theme_visited.into_iter().collect(),
            question_visited: snapshot.question_visited.into_iter().collect(),
            dropped: snapshot.dropped.into_iter().collect(),
            records: snapshot.records.into_iter().collect(),
        };

        Self {
            inner: Mutex::new(inner),
        }
    }

    // A panicking worker cannot leave the sets half-updated, so a poisoned lock is safe to reuse
    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks a URL as visited under the given kind
    ///
    /// Returns false (and changes nothing) if the URL is already in either visited set
    /// or the kind is `Unknown`; the caller must not process the page again.
    pub fn mark_visited(&self, url: &str, kind: PageKind) -> bool {
        let mut inner = self.lock();

        if inner.is_visited(url) {
            return false;
        }

        match kind {
            PageKind::Theme => inner.theme_visited.insert(url.to_string()),
            PageKind::Question => inner.question_visited.insert(url.to_string()),
            PageKind::Unknown => false,
        }
    }

    /// Marks a URL as permanently failed
    ///
    /// Returns false if the URL was already visited or dropped.
    pub fn mark_dropped(&self, url: &str) -> bool {
        let mut inner = self.lock();

        if inner.is_visited(url) {
            return false;
        }

        inner.dropped.insert(url.to_string())
    }

    /// Returns true if the URL is in either visited set
    pub fn is_visited(&self, url: &str) -> bool {
        self.lock().is_visited(url)
    }

    /// Returns true if the URL was visited or dropped; such URLs are never fetched again
    pub fn is_known(&self, url: &str) -> bool {
        let inner = self.lock();
        inner.is_visited(url) || inner.dropped.contains(url)
    }

    /// Stores the record harvested from a question page
    pub fn put_record(&self, url: &str, question: String, answer: String) {
        self.lock()
            .records
            .insert(url.to_string(), Record { question, answer });
    }

    pub fn record_count(&self) -> usize {
        self.lock().records.len()
    }

    pub fn theme_count(&self) -> usize {
        self.lock().theme_visited.len()
    }

    pub fn question_count(&self) -> usize {
        self.lock().question_visited.len()
    }

    /// Copies all records out of the store
    pub fn records(&self) -> RecordMap {
        self.lock()
            .records
            .iter()
            .map(|(url, record)| (url.clone(), record.clone()))
            .collect()
    }

    /// Takes a consistent point-in-time copy of the whole store
    pub fn snapshot(&self) -> StoreSnapshot {
        let inner = self.lock();
        StoreSnapshot {
            theme_visited: inner.theme_visited.iter().cloned().collect(),
            question_visited: inner.question_visited.iter().cloned().collect(),
            dropped: inner.dropped.iter().cloned().collect(),
            records: inner
                .records
                .iter()
                .map(|(url, record)| (url.clone(), record.clone()))
                .collect(),
        }
    }

    /// Writes all records through the given output handler
    ///
    /// Records are copied out first; no I/O happens while the lock is held.
    pub fn flush(&self, writer: &dyn OutputHandler) -> OutputResult<()> {
        let records = self.records();
        writer.write_records(&records)?;
        tracing::debug!("Flushed {} records to {}", records.len(), writer.describe());
        Ok(())
    }
}
