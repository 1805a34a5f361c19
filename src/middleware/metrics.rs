//! Request counters.
//!
//! The extension point between the request logger and the error-handling
//! stage. Deliberately small: two process-wide counters, readable through
//! the router for a debug endpoint or an exporter to poll.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::fault::Fault;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::reply::Reply;
use crate::request::Request;
use crate::state::RequestState;

/// Counts completed and failed requests.
///
/// Sits inside the logger and outside error handling, so by the time it
/// observes the state the failure flag is settled. Plain atomics — shared
/// read-only across request tasks by design.
#[derive(Debug, Default)]
pub struct Metrics {
    requests: AtomicU64,
    failures: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total requests that ran the full pipeline.
    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Requests that failed or panicked.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

impl Middleware for Metrics {
    fn name(&self) -> &'static str {
        "metrics"
    }

    fn around<'a>(
        &'a self,
        state: &'a mut RequestState,
        req: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<Reply, Fault>> {
        Box::pin(async move {
            let outcome = next.run(state, req).await;
            self.requests.fetch_add(1, Ordering::Relaxed);
            if state.failed() {
                self.failures.fetch_add(1, Ordering::Relaxed);
            }
            outcome
        })
    }
}
