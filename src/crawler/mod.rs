//! Crawler module for catalog fetching and traversal
//!
//! This module contains the core crawling logic, including:
//! - Fetching documents over HTTP or from disk behind a shared limiter
//! - Concurrent link expansion with quiescence detection
//! - The backpressure bridge to the consumer

mod bridge;
mod fetcher;
mod limiter;
mod tracker;
mod traverser;

pub use bridge::{bridge, Bridge, BridgeItem, BridgeReader};
pub use fetcher::{build_http_client, FetchError, FetchErrorKind, FetchPermit, Fetcher};
pub use limiter::{DispatchSlot, FetchLimiter};
pub use tracker::WorkTracker;
pub use traverser::{spawn_crawl, CancelHandle, CrawlHandle, CrawlSummary, Traverser};

use crate::config::Config;
use crate::location::Location;
use crate::output::{drain_into, Sink};
use crate::WalkError;
use std::future::Future;

/// Runs a complete crawl into a sink
///
/// This is the main entry point for a crawl. It will:
/// 1. Build the fetcher and the bridge from the configuration
/// 2. Spawn the traversal from `root`
/// 3. Feed every document to `sink` until the end of the stream
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - The crawl reached quiescence
/// * `Err(WalkError)` - The client could not be built or the sink failed
pub async fn crawl(
    config: &Config,
    root: Location,
    sink: &mut dyn Sink,
) -> Result<CrawlSummary, WalkError> {
    crawl_until(config, root, sink, std::future::pending()).await
}

/// Like [`crawl`], but cancels the crawl once `shutdown` resolves
///
/// Documents fetched before the cancellation still reach `sink`.
pub async fn crawl_until<F>(
    config: &Config,
    root: Location,
    sink: &mut dyn Sink,
    shutdown: F,
) -> Result<CrawlSummary, WalkError>
where
    F: Future<Output = ()>,
{
    let handle = spawn_crawl(config, root)?;
    let cancel = handle.cancel.clone();

    let drain = drain_into(handle.reader, sink);
    tokio::pin!(drain);
    tokio::pin!(shutdown);

    let drained = tokio::select! {
        result = &mut drain => result,
        _ = &mut shutdown => {
            cancel.cancel();
            drain.await
        }
    };

    if let Err(e) = drained {
        // The reader is gone; stop the traversal instead of letting it stall
        cancel.cancel();
        let _ = handle.task.await;
        return Err(e.into());
    }

    Ok(handle.task.await?)
}
