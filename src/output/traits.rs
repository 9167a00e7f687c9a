//! Sink trait and output errors
//!
//! A sink is the consumer end of a crawl: it receives every document read
//! from the bridge, in delivery order, and is finalized once at the end of
//! the stream. Storage or indexing backends plug in here.

use crate::document::Document;
use thiserror::Error;

/// Errors that can occur while writing output
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize document: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Consumer of crawled documents
pub trait Sink {
    /// Records one document
    fn write_document(&mut self, document: &Document) -> OutputResult<()>;

    /// Called once after the last document
    fn finish(&mut self) -> OutputResult<()>;
}
