//! Frontier of URLs awaiting a fetch attempt
//!
//! A frontier is built for one round at a time. It keeps insertion order and silently
//! ignores URLs it already holds.

use crate::state::PageStore;
use std::collections::HashSet;
use url::Url;

/// De-duplicated, insertion-ordered set of URLs for one crawl round
#[derive(Debug, Clone, Default)]
pub struct Frontier {
    urls: Vec<Url>,
    seen: HashSet<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_urls(urls: impl IntoIterator<Item = Url>) -> Self {
        let mut frontier = Self::new();
        frontier.extend(urls);
        frontier
    }

    /// Adds a URL; returns false if it was already queued
    pub fn push(&mut self, url: Url) -> bool {
        if self.seen.insert(url.as_str().to_string()) {
            self.urls.push(url);
            true
        } else {
            false
        }
    }

    pub fn extend(&mut self, urls: impl IntoIterator<Item = Url>) {
        for url in urls {
            self.push(url);
        }
    }

    pub fn contains(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Removes every URL the store has already visited or dropped
    ///
    /// Returns the number of URLs removed.
    pub fn discard_known(&mut self, store: &PageStore) -> usize {
        let before = self.urls.len();
        let seen = &mut self.seen;
        self.urls.retain(|url| {
            let known = store.is_known(url.as_str());
            if known {
                seen.remove(url.as_str());
            }
            !known
        });
        before - self.urls.len()
    }

    /// URLs as strings, in queue order
    pub fn to_strings(&self) -> Vec<String> {
        self.urls.iter().map(|url| url.as_str().to_string()).collect()
    }

    pub fn into_urls(self) -> Vec<Url> {
        self.urls
    }
}
