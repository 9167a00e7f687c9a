//! Backpressure-aware buffer between the traverser and a consumer
//!
//! The producer side ([`Bridge`]) appends documents and learns from the return
//! value of [`Bridge::write`] when it should stop. It then waits on
//! [`Bridge::drained`] until the consumer side ([`BridgeReader`]) has caught up.
//! The end of the crawl is signalled with [`Bridge::finish`]; the reader only
//! reports [`BridgeItem::EndOfStream`] after every buffered document has been
//! handed out.

use crate::config::{BridgeConfig, BridgeOrder};
use crate::document::Document;
use futures::Stream;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Notify;

/// One item read from the bridge
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeItem {
    Document(Document),
    /// The crawl is finished and the buffer is empty
    EndOfStream,
}

#[derive(Debug, Default)]
struct BufferState {
    buffer: VecDeque<Document>,
    finished: bool,
    reader_closed: bool,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<BufferState>,
    high_water_mark: usize,
    order: BridgeOrder,
    /// Wakes the reader after a write or finish
    readable: Notify,
    /// Wakes paused producers once the buffer is below the high-water mark
    drained: Notify,
}

/// Producer handle
#[derive(Debug, Clone)]
pub struct Bridge {
    shared: Arc<Shared>,
}

/// Consumer handle
///
/// Dropping the reader closes the bridge: buffered documents are discarded
/// and paused producers are released.
#[derive(Debug)]
pub struct BridgeReader {
    shared: Arc<Shared>,
}

/// Creates a connected producer/consumer pair
pub fn bridge(config: &BridgeConfig) -> (Bridge, BridgeReader) {
    let shared = Arc::new(Shared {
        state: Mutex::new(BufferState::default()),
        high_water_mark: config.high_water_mark.max(1),
        order: config.order,
        readable: Notify::new(),
        drained: Notify::new(),
    });

    (
        Bridge {
            shared: shared.clone(),
        },
        BridgeReader { shared },
    )
}

impl Bridge {
    /// Appends a document
    ///
    /// # Returns
    ///
    /// * `true` - The buffer is still below its high-water mark
    /// * `false` - The caller should wait on [`Bridge::drained`] before producing
    ///   more. Also returned when the document was discarded because the
    ///   reader is gone or the bridge is already finished.
    pub fn write(&self, document: Document) -> bool {
        let mut state = self.shared.state.lock();

        if state.reader_closed {
            return false;
        }

        if state.finished {
            tracing::debug!(
                "Discarding {} written after end of stream",
                document.location()
            );
            return false;
        }

        state.buffer.push_back(document);
        let below = state.buffer.len() < self.shared.high_water_mark;
        drop(state);

        self.shared.readable.notify_one();
        below
    }

    /// Waits until the buffer is below its high-water mark
    ///
    /// Resolves immediately if it already is, or if the reader is gone.
    pub async fn drained(&self) {
        loop {
            let notified = self.shared.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.has_capacity() {
                return;
            }

            notified.await;
        }
    }

    /// Marks the end of the stream
    ///
    /// Only the first call has an effect; it returns true.
    pub fn finish(&self) -> bool {
        let mut state = self.shared.state.lock();
        if state.finished {
            return false;
        }
        state.finished = true;
        drop(state);

        self.shared.readable.notify_one();
        true
    }

    /// True if the reader has been dropped
    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().reader_closed
    }

    pub fn is_finished(&self) -> bool {
        self.shared.state.lock().finished
    }

    /// Number of buffered documents
    pub fn len(&self) -> usize {
        self.shared.state.lock().buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn high_water_mark(&self) -> usize {
        self.shared.high_water_mark
    }

    fn has_capacity(&self) -> bool {
        let state = self.shared.state.lock();
        state.reader_closed || state.buffer.len() < self.shared.high_water_mark
    }
}

impl BridgeReader {
    /// Waits for the next document or the end of the stream
    pub async fn read(&mut self) -> BridgeItem {
        loop {
            if let Some(item) = self.try_read() {
                return item;
            }
            self.shared.readable.notified().await;
        }
    }

    /// Returns the next item if one is available without waiting
    pub fn try_read(&mut self) -> Option<BridgeItem> {
        let mut state = self.shared.state.lock();

        let next = match self.shared.order {
            BridgeOrder::Fifo => state.buffer.pop_front(),
            BridgeOrder::Lifo => state.buffer.pop_back(),
        };

        match next {
            Some(document) => {
                let below = state.buffer.len() < self.shared.high_water_mark;
                drop(state);
                if below {
                    self.shared.drained.notify_waiters();
                }
                Some(BridgeItem::Document(document))
            }
            None if state.finished => Some(BridgeItem::EndOfStream),
            None => None,
        }
    }

    /// Adapts the reader into a stream of documents ending at end of stream
    pub fn into_stream(self) -> impl Stream<Item = Document> {
        futures::stream::unfold(self, |mut reader| async move {
            match reader.read().await {
                BridgeItem::Document(document) => Some((document, reader)),
                BridgeItem::EndOfStream => None,
            }
        })
    }
}

impl Drop for BridgeReader {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock();
        state.reader_closed = true;
        state.buffer.clear();
        drop(state);

        self.shared.drained.notify_waiters();
    }
}
