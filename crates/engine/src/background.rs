//! Bounded pool for fire-and-forget side effects.

use enhancer_core::Result;
use enhancer_telemetry::metrics::track_background_task;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex, Notify};

struct QueuedTask {
    name: &'static str,
    job: BoxFuture<'static, Result<()>>,
}

#[derive(Default)]
struct Tracker {
    pending: AtomicUsize,
    drained: Notify,
}

impl Tracker {
    fn begin(&self) {
        self.pending.fetch_add(1, Ordering::SeqCst);
    }

    fn finish(&self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.drained.notify_waiters();
        }
    }
}

/// Fixed set of workers draining a bounded queue.
///
/// Tasks are detached from the request that produced them: they carry their
/// own timeout and keep running after the response has been sent. When the
/// queue is full new tasks are dropped rather than blocking the caller.
pub struct BackgroundPool {
    sender: mpsc::Sender<QueuedTask>,
    tracker: Arc<Tracker>,
    workers: usize,
}

impl BackgroundPool {
    /// Start `workers` workers on the current tokio runtime.
    pub fn new(workers: usize, capacity: usize, task_timeout: Duration) -> Self {
        let workers = workers.max(1);
        let (sender, receiver) = mpsc::channel::<QueuedTask>(capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let tracker = Arc::new(Tracker::default());

        for worker in 0..workers {
            let receiver = receiver.clone();
            let tracker = tracker.clone();
            tokio::spawn(async move {
                loop {
                    let next = receiver.lock().await.recv().await;
                    let Some(task) = next else { break };
                    let outcome = run_task(task.name, task.job, task_timeout).await;
                    track_background_task(task.name, outcome);
                    tracker.finish();
                }
                tracing::debug!(worker, "Background worker stopped");
            });
        }

        Self {
            sender,
            tracker,
            workers,
        }
    }

    /// Queue a task. Returns false when it was dropped.
    pub fn submit<F>(&self, name: &'static str, job: F) -> bool
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        self.tracker.begin();
        let task = QueuedTask {
            name,
            job: job.boxed(),
        };
        match self.sender.try_send(task) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.tracker.finish();
                tracing::warn!(task = name, "Background queue full, dropping task");
                track_background_task(name, "dropped");
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.tracker.finish();
                tracing::warn!(task = name, "Background pool closed, dropping task");
                track_background_task(name, "dropped");
                false
            }
        }
    }

    /// Tasks queued or running.
    pub fn pending(&self) -> usize {
        self.tracker.pending.load(Ordering::SeqCst)
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Resolve once no task is queued or running.
    pub async fn idle(&self) {
        loop {
            let drained = self.tracker.drained.notified();
            if self.pending() == 0 {
                return;
            }
            drained.await;
        }
    }
}

async fn run_task(
    name: &'static str,
    job: BoxFuture<'static, Result<()>>,
    timeout: Duration,
) -> &'static str {
    match tokio::time::timeout(timeout, AssertUnwindSafe(job).catch_unwind()).await {
        Ok(Ok(Ok(()))) => "ok",
        Ok(Ok(Err(e))) => {
            tracing::warn!(task = name, error = %e, "Background task failed");
            "error"
        }
        Ok(Err(_)) => {
            tracing::error!(task = name, "Background task panicked");
            "panic"
        }
        Err(_) => {
            tracing::warn!(
                task = name,
                timeout_ms = timeout.as_millis() as u64,
                "Background task timed out"
            );
            "timeout"
        }
    }
}
