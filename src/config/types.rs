use serde::{Deserialize, Serialize};

/// Default entry point of the crawl
pub const DEFAULT_START_URL: &str = "https://www.gotquestions.org/content.html";

/// Default base address that relative content links are resolved against
pub const DEFAULT_BASE_URL: &str = "https://www.gotquestions.org/";

/// Main configuration structure for qa-harvest
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
    #[serde(default)]
    pub selectors: SelectorConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Page the crawl starts from on a fresh run
    #[serde(rename = "start-url")]
    pub start_url: String,

    /// Base address relative links are resolved against
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum number of concurrent page fetches
    ///
    /// The target site starts answering 429 at roughly ten concurrent clients.
    pub workers: usize,

    /// Number of completed page tasks between checkpoints
    #[serde(rename = "checkpoint-interval")]
    pub checkpoint_interval: usize,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            start_url: DEFAULT_START_URL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            workers: 8,
            checkpoint_interval: 100,
            request_timeout_secs: 30,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "qa-harvest".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
        }
    }
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    ///
    /// Format: `CrawlerName/Version` or `CrawlerName/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        match &self.contact_url {
            Some(contact) => format!(
                "{}/{} (+{})",
                self.crawler_name, self.crawler_version, contact
            ),
            None => format!("{}/{}", self.crawler_name, self.crawler_version),
        }
    }
}

/// Record serialization format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// A single JSON object mapping URL to `[question, answer]`
    #[default]
    Json,
    /// A SQLite database with one `records` table
    Sqlite,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path of the record file (JSON or SQLite depending on `format`)
    #[serde(rename = "records-path")]
    pub records_path: String,

    /// Path of the checkpoint file
    #[serde(rename = "checkpoint-path")]
    pub checkpoint_path: String,

    /// Record serialization format
    pub format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            records_path: "questions.json".to_string(),
            checkpoint_path: "checkpoint.json".to_string(),
            format: OutputFormat::Json,
        }
    }
}

/// Forward proxy configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProxyConfig {
    /// Proxy address, e.g. `http://127.0.0.1:3128`
    pub url: String,
}

/// CSS selectors describing the page structure of the target site
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Marker element whose text is "Theme" or "Question"
    pub label: String,

    /// Links inside the primary content region of a theme page
    #[serde(rename = "content-links")]
    pub content_links: String,

    /// Question title element
    pub question: String,

    /// Answer body element
    pub answer: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            label: "div.label.gradient-to-tr".to_string(),
            content_links: "div.content a[href]".to_string(),
            question: "span[itemprop='name headline'][property='og:title']".to_string(),
            answer: "div[itemprop='articleBody']".to_string(),
        }
    }
}
