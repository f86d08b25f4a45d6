use super::error::{GraphError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, timeout_at};
use uuid::Uuid;

/// Wall-clock budget for one distance batch.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-request deadline carried down to every store call.
///
/// Store futures run under [`RequestContext::call`]; on expiry the in-flight
/// future is dropped, which cancels it, and a `StoreTimeout` is returned.
/// Dropping the request future itself cancels everything below it the same way.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: String,
    deadline: Instant,
}

impl RequestContext {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            deadline: Instant::now() + timeout,
        }
    }

    /// Replaces the generated id, e.g. with an inbound `x-request-id`.
    pub fn request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.request_id
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Runs `operation` under the request deadline.
    pub async fn call<T, F>(&self, what: &str, operation: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match timeout_at(self.deadline, operation).await {
            Ok(result) => result,
            Err(_) => Err(GraphError::StoreTimeout(format!(
                "{} exceeded the request deadline",
                what
            ))),
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::with_timeout(DEFAULT_REQUEST_TIMEOUT)
    }
}
