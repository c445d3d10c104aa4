//! The serialized work queue.
//!
//! Hardware callback threads and the telephony-event thread must not touch
//! devices directly: device writes take the registry lock and can block on
//! hardware. Every device-mutating intent is instead enqueued here and
//! drained by a single consumer thread in strict arrival order, so
//! conflicting mutations can never interleave.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, warn};

type WorkItem = Box<dyn FnOnce() + Send + 'static>;

/// Multi-producer, single-consumer FIFO queue of deferred actions.
///
/// The consumer thread catches a panicking item, logs it, and keeps
/// draining: one faulty action never stops the worker. The thread exits
/// only when the queue itself is dropped.
pub struct WorkQueue {
    tx: mpsc::UnboundedSender<WorkItem>,
}

impl WorkQueue {
    /// Spawn the consumer thread and return the queue handle.
    #[must_use]
    pub fn spawn(name: &str) -> Arc<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<WorkItem>();

        let thread_name = name.to_string();
        std::thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                while let Some(item) = rx.blocking_recv() {
                    if catch_unwind(AssertUnwindSafe(item)).is_err() {
                        error!(queue = %thread_name, "Work item panicked; queue continues");
                    }
                }
            })
            .expect("Failed to spawn work queue thread");

        Arc::new(Self { tx })
    }

    /// Append a deferred action. Never blocks the producer.
    pub fn enqueue(&self, action: impl FnOnce() + Send + 'static) {
        if self.tx.send(Box::new(action)).is_err() {
            warn!("Work queue closed, dropping action");
        }
    }
}
