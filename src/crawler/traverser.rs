//! Crawl orchestration
//!
//! The traverser owns every visit task of one crawl in a `JoinSet`. A visit
//! fetches one location, writes the document into the bridge and reports the
//! locations it links to; the run loop then launches those as new visits.
//!
//! Quiescence is tracked with a [`WorkTracker`]: a visit is counted when it is
//! launched and released only after its children have been launched, so the
//! count cannot touch zero while expansion is still pending. The visit that
//! brings it to zero ends the crawl and the end-of-stream marker is written.

use crate::config::Config;
use crate::crawler::bridge::{bridge, Bridge, BridgeReader};
use crate::crawler::fetcher::Fetcher;
use crate::crawler::tracker::WorkTracker;
use crate::location::{expand, Location};
use crate::WalkError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};

/// Totals for one crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Documents written to the bridge
    pub documents: u64,

    /// Branches abandoned because their fetch failed
    pub failures: u64,

    /// Links not followed because of the depth limit
    pub depth_limited: u64,

    /// Whether the crawl was cancelled before finishing
    pub cancelled: bool,

    pub elapsed: Duration,
}

/// Aborts a running crawl from outside
#[derive(Debug, Clone)]
pub struct CancelHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    /// Requests cancellation
    ///
    /// In-flight visits stop at their next suspension point and no new visits
    /// are launched. The end-of-stream marker is still written.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }
}

/// Result of one visit task
#[derive(Debug)]
enum VisitOutcome {
    /// The document was written; these are its children
    Expanded {
        children: Vec<Location>,
        depth: u32,
    },
    /// The fetch failed and the branch was dropped
    Failed,
    /// Cancelled or the reader went away
    Stopped,
}

/// Drives a crawl from a root location
pub struct Traverser {
    fetcher: Fetcher,
    bridge: Bridge,
    tracker: Arc<WorkTracker>,
    max_depth: Option<u32>,
    cancel: CancelHandle,
    cancel_rx: watch::Receiver<bool>,
}

impl Traverser {
    /// Creates a traverser writing into `bridge`
    pub fn new(fetcher: Fetcher, bridge: Bridge) -> Self {
        let (sender, cancel_rx) = watch::channel(false);
        Self {
            fetcher,
            bridge,
            tracker: Arc::new(WorkTracker::new()),
            max_depth: None,
            cancel: CancelHandle {
                sender: Arc::new(sender),
            },
            cancel_rx,
        }
    }

    /// Stops following links deeper than `max_depth` below the root
    pub fn with_max_depth(mut self, max_depth: Option<u32>) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// The outstanding-work counter of this crawl
    pub fn tracker(&self) -> Arc<WorkTracker> {
        self.tracker.clone()
    }

    /// Crawls everything reachable from `root`
    ///
    /// Returns once the crawl is quiescent. By then the end-of-stream marker
    /// has been written to the bridge.
    pub async fn run(self, root: Location) -> CrawlSummary {
        let start = Instant::now();
        let mut summary = CrawlSummary::default();
        let mut tasks = JoinSet::new();

        tracing::info!("Starting crawl at {}", root);
        self.launch(&mut tasks, root, 0);

        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.unwrap_or_else(|e| {
                tracing::error!("Visit task ended abnormally: {}", e);
                VisitOutcome::Failed
            });

            match outcome {
                VisitOutcome::Expanded { children, depth } => {
                    summary.documents += 1;
                    for child in children {
                        if self.should_stop() {
                            break;
                        }
                        if self.max_depth.is_some_and(|max| depth >= max) {
                            tracing::debug!("Not following {} beyond depth {}", child, depth);
                            summary.depth_limited += 1;
                            continue;
                        }
                        self.launch(&mut tasks, child, depth + 1);
                    }
                }
                VisitOutcome::Failed => summary.failures += 1,
                VisitOutcome::Stopped => {}
            }

            // Released only after its children are counted
            if self.tracker.finish() {
                self.bridge.finish();
            }
        }

        summary.cancelled = self.cancel.is_cancelled();
        summary.elapsed = start.elapsed();

        tracing::info!(
            "Crawl finished: {} documents, {} failed branches in {:?}{}",
            summary.documents,
            summary.failures,
            summary.elapsed,
            if summary.cancelled { " (cancelled)" } else { "" }
        );

        summary
    }

    fn should_stop(&self) -> bool {
        self.cancel.is_cancelled() || self.bridge.is_closed()
    }

    fn launch(&self, tasks: &mut JoinSet<VisitOutcome>, location: Location, depth: u32) {
        self.tracker.begin();

        let fetcher = self.fetcher.clone();
        let bridge = self.bridge.clone();
        let mut cancel_rx = self.cancel_rx.clone();

        tasks.spawn(async move {
            tokio::select! {
                outcome = visit(&fetcher, &bridge, location, depth) => outcome,
                _ = cancelled(&mut cancel_rx) => VisitOutcome::Stopped,
            }
        });
    }
}

/// Fetches one location, hands the document to the bridge and resolves its links
async fn visit(fetcher: &Fetcher, bridge: &Bridge, location: Location, depth: u32) -> VisitOutcome {
    let Some(permit) = fetcher.acquire().await else {
        tracing::warn!("Fetch limiter closed before {} could be fetched", location);
        return VisitOutcome::Failed;
    };

    // Hold the slot but do not start new I/O while the consumer is behind.
    // Dispatch spacing is applied by the permit once I/O actually starts.
    bridge.drained().await;
    if bridge.is_closed() {
        return VisitOutcome::Stopped;
    }

    let document = match permit.fetch(&location).await {
        Ok(document) => document,
        Err(e) => {
            tracing::warn!("{}", e);
            return VisitOutcome::Failed;
        }
    };

    let children = expand(&document, &location);
    if depth == 0 {
        tracing::info!("Fetched root {} ({} links to follow)", location, children.len());
    } else {
        tracing::debug!(
            "Fetched {} at depth {} ({} links to follow)",
            location,
            depth,
            children.len()
        );
    }

    if !bridge.write(document) {
        bridge.drained().await;
    }

    VisitOutcome::Expanded { children, depth }
}

async fn cancelled(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|cancelled| *cancelled).await.is_err() {
        // Sender gone without cancelling
        std::future::pending::<()>().await;
    }
}

/// A crawl running on the tokio runtime
pub struct CrawlHandle {
    /// Consumer side of the bridge
    pub reader: BridgeReader,

    pub cancel: CancelHandle,

    /// Resolves to the summary once the crawl is quiescent
    pub task: JoinHandle<CrawlSummary>,
}

/// Spawns a crawl from `root` configured by `config`
///
/// Must be called from within a tokio runtime.
pub fn spawn_crawl(config: &Config, root: Location) -> Result<CrawlHandle, WalkError> {
    let fetcher = Fetcher::new(config)?;
    let (producer, reader) = bridge(&config.bridge);
    let traverser = Traverser::new(fetcher, producer).with_max_depth(config.crawler.max_depth);
    let cancel = traverser.cancel_handle();
    let task = tokio::spawn(traverser.run(root));

    Ok(CrawlHandle {
        reader,
        cancel,
        task,
    })
}
