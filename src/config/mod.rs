//! Configuration module for Catalog-Walk
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key is optional, so a crawl can run without any file at all.
//!
//! # Example
//!
//! ```no_run
//! use catalog_walk::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("walk.toml")).unwrap();
//! println!("High-water mark: {}", config.bridge.high_water_mark);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{BridgeConfig, BridgeOrder, Config, CrawlerConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
