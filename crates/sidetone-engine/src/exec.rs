//! Execution-context marshaling.
//!
//! The call-control layer requires its commands to run on one designated
//! thread. [`ExecutionContext::run_sync`] is the generic submit-and-wait
//! primitive: callers on any other thread hand their job over and block
//! until it completes; callers already on the context run it inline, so
//! re-entrant dispatch never deadlocks.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread::ThreadId;

use tokio::sync::{mpsc, oneshot};
use tracing::{error, warn};

/// A unit of work submitted to an execution context.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// A designated execution context with synchronous hand-off.
pub trait ExecutionContext: Send + Sync {
    /// Whether the calling thread is the context itself.
    fn is_current(&self) -> bool;

    /// Run `job` on the context and return once it has completed.
    fn run_sync(&self, job: Job);
}

/// The provided context: one named thread draining a job channel.
pub struct CommandThread {
    tx: mpsc::UnboundedSender<(Job, oneshot::Sender<()>)>,
    thread_id: ThreadId,
}

impl CommandThread {
    /// Spawn the command thread.
    #[must_use]
    pub fn spawn() -> Arc<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<(Job, oneshot::Sender<()>)>();
        let (id_tx, id_rx) = std::sync::mpsc::channel();

        std::thread::Builder::new()
            .name("sidetone-commands".to_string())
            .spawn(move || {
                let _ = id_tx.send(std::thread::current().id());
                while let Some((job, done)) = rx.blocking_recv() {
                    if catch_unwind(AssertUnwindSafe(job)).is_err() {
                        error!("Command job panicked");
                    }
                    let _ = done.send(());
                }
            })
            .expect("Failed to spawn command thread");

        let thread_id = id_rx.recv().expect("Command thread did not start");
        Arc::new(Self { tx, thread_id })
    }
}

impl ExecutionContext for CommandThread {
    fn is_current(&self) -> bool {
        std::thread::current().id() == self.thread_id
    }

    fn run_sync(&self, job: Job) {
        if self.is_current() {
            job();
            return;
        }

        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send((job, done_tx)).is_err() {
            warn!("Command thread gone, dropping job");
            return;
        }
        // The worker always signals, even when the job panicked.
        let _ = done_rx.blocking_recv();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_run_sync_completes_before_returning() {
        let ctx = CommandThread::spawn();
        let done = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&done);
        ctx.run_sync(Box::new(move || flag.store(true, Ordering::Release)));

        assert!(done.load(Ordering::Acquire));
    }

    #[test]
    fn test_jobs_run_on_the_context_thread() {
        let ctx = CommandThread::spawn();
        let observed = Arc::new(Mutex::new(None));

        let seen = Arc::clone(&observed);
        let ctx_inner = Arc::clone(&ctx);
        ctx.run_sync(Box::new(move || {
            *seen.lock().unwrap() = Some(ctx_inner.is_current());
        }));

        assert!(!ctx.is_current());
        assert_eq!(*observed.lock().unwrap(), Some(true));
    }

    #[test]
    fn test_reentrant_dispatch_runs_inline() {
        let ctx = CommandThread::spawn();
        let done = Arc::new(AtomicBool::new(false));

        let outer_ctx = Arc::clone(&ctx);
        let flag = Arc::clone(&done);
        ctx.run_sync(Box::new(move || {
            // Already on the context: runs inline instead of deadlocking
            let inner_flag = Arc::clone(&flag);
            outer_ctx.run_sync(Box::new(move || inner_flag.store(true, Ordering::Release)));
        }));

        assert!(done.load(Ordering::Acquire));
    }

    #[test]
    fn test_panicking_job_still_signals_completion() {
        let ctx = CommandThread::spawn();
        ctx.run_sync(Box::new(|| panic!("boom")));

        // The thread survived and keeps serving
        let done = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&done);
        ctx.run_sync(Box::new(move || flag.store(true, Ordering::Release)));
        assert!(done.load(Ordering::Acquire));
    }
}
