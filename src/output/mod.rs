//! Output module for consuming crawl results
//!
//! This module handles:
//! - The [`Sink`] interface that downstream consumers implement
//! - Printing the first link of each document (`lines` format)
//! - Exporting full documents as newline-delimited JSON (`ndjson` format)
//! - Draining a bridge reader into a sink

mod lines;
mod ndjson;
mod traits;

pub use lines::LineSink;
pub use ndjson::NdjsonSink;
pub use traits::{OutputError, OutputResult, Sink};

use crate::crawler::{BridgeItem, BridgeReader};

/// Reads documents from the bridge into `sink` until the end of the stream
///
/// # Returns
///
/// * `Ok(u64)` - Number of documents handed to the sink
/// * `Err(OutputError)` - The sink failed; the reader is dropped, which
///   closes the bridge
pub async fn drain_into(mut reader: BridgeReader, sink: &mut dyn Sink) -> OutputResult<u64> {
    let mut count = 0;

    loop {
        match reader.read().await {
            BridgeItem::Document(document) => {
                sink.write_document(&document)?;
                count += 1;
            }
            BridgeItem::EndOfStream => break,
        }
    }

    sink.finish()?;
    tracing::debug!("Sink received {} documents", count);
    Ok(count)
}
