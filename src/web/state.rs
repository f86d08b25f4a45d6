use std::sync::Arc;
use std::time::Duration;

use crate::core::{DEFAULT_REQUEST_TIMEOUT, RequestContext};
use crate::degree::DegreeResolver;

#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<DegreeResolver>,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(resolver: Arc<DegreeResolver>) -> Self {
        Self {
            resolver,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Fresh context whose deadline starts now.
    pub fn request_context(&self) -> RequestContext {
        RequestContext::with_timeout(self.request_timeout)
    }
}
