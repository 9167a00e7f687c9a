//! Catalog-Walk: a concurrent crawler for linked JSON catalogs
//!
//! This crate walks a graph of JSON documents (for example a STAC catalog) by
//! following their `child` and `item` links, over HTTP(S) or the local
//! filesystem, and hands every fetched document to a consumer through a
//! backpressure-aware bridge.

pub mod config;
pub mod crawler;
pub mod document;
pub mod location;
pub mod output;

use thiserror::Error;

/// Main error type for Catalog-Walk operations
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Crawl task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Catalog-Walk operations
pub type Result<T> = std::result::Result<T, WalkError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Bridge, BridgeItem, CrawlSummary, FetchError, Fetcher, Traverser};
pub use document::{Document, Link, LinkRelation};
pub use location::Location;
