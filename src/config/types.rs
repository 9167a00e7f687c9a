use serde::Deserialize;

/// Main configuration structure for Catalog-Walk
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of fetches outstanding at once, across both transports
    #[serde(rename = "max-concurrent-fetches", default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: u32,

    /// Minimum time between two fetch dispatches (milliseconds)
    #[serde(rename = "min-dispatch-interval-ms", default = "default_min_dispatch_interval_ms")]
    pub min_dispatch_interval_ms: u64,

    /// Upper bound on a single fetch (milliseconds)
    #[serde(rename = "fetch-timeout-ms", default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Maximum link depth to follow from the root; unlimited when absent
    #[serde(rename = "max-depth", default)]
    pub max_depth: Option<u32>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: default_max_concurrent_fetches(),
            min_dispatch_interval_ms: default_min_dispatch_interval_ms(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            max_depth: None,
        }
    }
}

/// Delivery order of buffered documents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BridgeOrder {
    /// First written, first read
    #[default]
    Fifo,
    /// Last written, first read
    Lifo,
}

/// Bridge (producer/consumer buffer) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// Buffered document count at which writes start reporting backpressure
    #[serde(rename = "high-water-mark", default = "default_high_water_mark")]
    pub high_water_mark: usize,

    #[serde(default)]
    pub order: BridgeOrder,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            high_water_mark: default_high_water_mark(),
            order: BridgeOrder::default(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name", default = "default_crawler_name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version", default = "default_crawler_version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url", default)]
    pub contact_url: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: default_crawler_name(),
            crawler_version: default_crawler_version(),
            contact_url: None,
        }
    }
}

impl UserAgentConfig {
    /// Formats the User-Agent header value: `Name/Version (+ContactURL)`
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

fn default_max_concurrent_fetches() -> u32 {
    50
}

fn default_min_dispatch_interval_ms() -> u64 {
    10
}

fn default_fetch_timeout_ms() -> u64 {
    30_000
}

fn default_high_water_mark() -> usize {
    16
}

fn default_crawler_name() -> String {
    "catalog-walk".to_string()
}

fn default_crawler_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
