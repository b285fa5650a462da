//! Per-request execution context.

use enhancer_core::{Caller, Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Identity, trace id and deadline of one request.
///
/// Every collaborator call made on behalf of a request goes through
/// [`RequestContext::call`], which aborts the call once the deadline passes.
/// Dropping the request future drops the in-flight calls with it.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub trace_id: String,
    pub caller: Caller,
    deadline: Instant,
}

impl RequestContext {
    pub fn new(caller: Caller, timeout: Duration) -> Self {
        Self {
            trace_id: uuid::Uuid::new_v4().to_string(),
            caller,
            deadline: Instant::now() + timeout,
        }
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = trace_id.into();
        self
    }

    /// Context for one item of a batch: same caller and deadline.
    pub fn for_item(&self, index: usize) -> Self {
        Self {
            trace_id: format!("{}-{}", self.trace_id, index + 1),
            caller: self.caller.clone(),
            deadline: self.deadline,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }

    /// Run a fallible collaborator call bounded by the request deadline.
    pub async fn call<F, T>(&self, what: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout_at(self.deadline, fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::timeout(format!("{} exceeded the request deadline", what))),
        }
    }
}
