//! Bounded concurrency for fan-out work.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Caps how many futures run at once.
#[derive(Clone)]
pub struct TaskLimiter {
    permits: Arc<Semaphore>,
    limit: usize,
}

impl TaskLimiter {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            permits: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Permits not currently held.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run `fut` once a permit is free.
    pub async fn run<F, T>(&self, fut: F) -> T
    where
        F: Future<Output = T>,
    {
        // The semaphore is never closed, so acquisition only waits.
        let _permit = self.permits.acquire().await.ok();
        fut.await
    }

    /// Spawn `fut` onto the runtime; it starts once a permit is free.
    pub fn spawn<F, T>(&self, fut: F) -> JoinHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let permits = self.permits.clone();
        tokio::spawn(async move {
            let _permit = permits.acquire_owned().await.ok();
            fut.await
        })
    }
}

impl Default for TaskLimiter {
    fn default() -> Self {
        Self::new(5)
    }
}
