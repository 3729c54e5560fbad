// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Execution contexts for callbacks and script-side handler invocations.
//
// Where a response callback runs is a property of the channel, not of the
// code that happened to resolve the call. The channel hands every callback
// and every handler invocation to its `CallbackExecutor`.

use std::panic::{AssertUnwindSafe, catch_unwind};

use tokio::sync::mpsc;
use tracing::{error, warn};

/// Unit of work handed to an executor.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Decides on which thread callbacks run.
pub trait CallbackExecutor: Send + Sync {
    fn execute(&self, job: Job);
}

/// Runs jobs on the thread that resolved the call: the host callback thread
/// for responses, the caller's thread for cancel/close.
///
/// A panicking job is logged and contained.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineExecutor;

impl CallbackExecutor for InlineExecutor {
    fn execute(&self, job: Job) {
        run_contained(job);
    }
}

/// Spawns each job as a task on a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: tokio::runtime::Handle,
}

impl TokioExecutor {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Executor for the runtime the caller is running on, if any.
    pub fn current() -> Option<Self> {
        tokio::runtime::Handle::try_current().ok().map(Self::new)
    }
}

impl CallbackExecutor for TokioExecutor {
    fn execute(&self, job: Job) {
        self.handle.spawn(async move { job() });
    }
}

/// Queues jobs until the host drains them from its own main/UI thread via
/// [`CallbackQueue::run_pending`] or [`CallbackQueue::run`].
#[derive(Debug, Clone)]
pub struct QueueExecutor {
    tx: mpsc::UnboundedSender<Job>,
}

/// Receiving half of a [`QueueExecutor`].
#[derive(Debug)]
pub struct CallbackQueue {
    rx: mpsc::UnboundedReceiver<Job>,
}

impl QueueExecutor {
    pub fn new() -> (Self, CallbackQueue) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, CallbackQueue { rx })
    }
}

impl CallbackExecutor for QueueExecutor {
    fn execute(&self, job: Job) {
        // With nobody left to drain the queue the job would be lost, and a
        // lost callback is a call that never ends.
        if let Err(mpsc::error::SendError(job)) = self.tx.send(job) {
            warn!("callback queue is gone; running callback inline");
            run_contained(job);
        }
    }
}

impl CallbackQueue {
    /// Run every job queued so far. Returns how many ran.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            run_contained(job);
            ran += 1;
        }
        ran
    }

    /// Run jobs as they arrive until every `QueueExecutor` clone is dropped.
    pub async fn run(mut self) {
        while let Some(job) = self.rx.recv().await {
            run_contained(job);
        }
    }
}

fn run_contained(job: Job) {
    if catch_unwind(AssertUnwindSafe(job)).is_err() {
        error!("bridge callback panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_job(counter: &Arc<AtomicUsize>) -> Job {
        let counter = Arc::clone(counter);
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn inline_runs_immediately() {
        let counter = Arc::new(AtomicUsize::new(0));
        InlineExecutor.execute(counting_job(&counter));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn inline_contains_panics() {
        fn boom() {
            panic!("callback bug");
        }
        InlineExecutor.execute(Box::new(boom));
        let counter = Arc::new(AtomicUsize::new(0));
        InlineExecutor.execute(counting_job(&counter));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn queue_defers_until_drained() {
        let (exec, mut queue) = QueueExecutor::new();
        let counter = Arc::new(AtomicUsize::new(0));
        exec.execute(counting_job(&counter));
        exec.execute(counting_job(&counter));
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        assert_eq!(queue.run_pending(), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(queue.run_pending(), 0);
    }

    #[test]
    fn queue_without_receiver_runs_inline() {
        let (exec, queue) = QueueExecutor::new();
        drop(queue);
        let counter = Arc::new(AtomicUsize::new(0));
        exec.execute(counting_job(&counter));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn tokio_executor_spawns() {
        let exec = TokioExecutor::current().expect("inside a runtime");
        let (tx, rx) = tokio::sync::oneshot::channel();
        exec.execute(Box::new(move || {
            let _ = tx.send(7);
        }));
        assert_eq!(rx.await.unwrap(), 7);
    }

    #[tokio::test]
    async fn queue_run_ends_when_senders_drop() {
        let (exec, queue) = QueueExecutor::new();
        let counter = Arc::new(AtomicUsize::new(0));
        exec.execute(counting_job(&counter));
        drop(exec);
        queue.run().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
