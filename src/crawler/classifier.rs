//! HTML page classifier
//!
//! Decides whether a fetched page is a theme page, a question page or neither, and
//! extracts the matching payload:
//! - theme pages yield the relative content links, resolved against the site base
//! - question pages yield the question title and the cleaned answer body

use crate::config::{Config, SelectorConfig};
use crate::state::PageKind;
use crate::url::resolve_link;
use crate::ConfigError;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Boilerplate label the answer body starts with
const ANSWER_LABEL: &str = "Answer";

/// Result of classifying one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Theme page with its outbound content links (absolute, de-duplicated)
    Theme { links: Vec<Url> },

    /// Question page; either field may be empty if the page lacks it
    Question { question: String, answer: String },

    Unknown,
}

/// Turns raw page content into a [`Classification`]
///
/// Implementations must be pure and must not panic on malformed input.
pub trait Classifier: Send + Sync {
    fn classify(&self, body: &str) -> Classification;
}

/// Classifier for the target site's markup
#[derive(Debug)]
pub struct SiteClassifier {
    base_url: Url,
    label: Selector,
    content_links: Selector,
    question: Selector,
    answer: Selector,
}

impl SiteClassifier {
    /// Compiles the selectors; fails if any of them does not parse
    pub fn new(base_url: Url, selectors: &SelectorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url,
            label: compile(&selectors.label)?,
            content_links: compile(&selectors.content_links)?,
            question: compile(&selectors.question)?,
            answer: compile(&selectors.answer)?,
        })
    }

    /// Builds the classifier from the crawler configuration
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let base_url = Url::parse(&config.crawler.base_url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid base_url '{}': {}", config.crawler.base_url, e))
        })?;
        Self::new(base_url, &config.selectors)
    }

    fn extract_links(&self, document: &Html) -> Vec<Url> {
        let mut seen = HashSet::new();
        document
            .select(&self.content_links)
            .filter_map(|element| element.value().attr("href"))
            .filter_map(|href| resolve_link(href, &self.base_url))
            .filter(|url| seen.insert(url.as_str().to_string()))
            .collect()
    }

    fn first_text(&self, document: &Html, selector: &Selector) -> String {
        document
            .select(selector)
            .next()
            .map(element_text)
            .unwrap_or_default()
    }
}

impl Classifier for SiteClassifier {
    fn classify(&self, body: &str) -> Classification {
        let document = Html::parse_document(body);

        let kind = document
            .select(&self.label)
            .next()
            .map(|label| PageKind::from_label(&element_text(label)))
            .unwrap_or(PageKind::Unknown);

        match kind {
            PageKind::Theme => Classification::Theme {
                links: self.extract_links(&document),
            },
            PageKind::Question => Classification::Question {
                question: self.first_text(&document, &self.question).trim().to_string(),
                answer: clean_answer(&self.first_text(&document, &self.answer)),
            },
            PageKind::Unknown => Classification::Unknown,
        }
    }
}

fn compile(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}

/// Strips the leading "Answer" label and surrounding whitespace from an answer body
///
/// Only the label at the very start is removed. The word "Answer" anywhere else in the
/// text is part of the answer and is kept, so an answer quoting "the Answer is..." survives
/// unchanged.
pub fn clean_answer(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix(ANSWER_LABEL)
        .unwrap_or(trimmed)
        .trim()
        .to_string()
}
