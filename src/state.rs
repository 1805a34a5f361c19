//! Per-request state record.

use std::time::Instant;

use http::StatusCode;
use tracing::error;

/// Mutable state owned by a single request's dispatch.
///
/// Created by the router when a request enters the pipeline, passed by
/// `&mut` through every middleware stage, and dropped when the chain
/// returns. It is never shared across requests, so no synchronization is
/// needed — the chain runs as one logical flow of control.
///
/// Only the error-handling stage writes to it: the failure flag when the
/// inner chain fails or panics, and the status code exactly once when the
/// response is finalized.
pub struct RequestState {
    started: Instant,
    status: Option<StatusCode>,
    failed: bool,
    writes: u32,
}

impl RequestState {
    pub(crate) fn new() -> Self {
        Self {
            started: Instant::now(),
            status: None,
            failed: false,
            writes: 0,
        }
    }

    /// The instant the request entered the pipeline.
    pub fn started(&self) -> Instant {
        self.started
    }

    /// The status code of the written response, once one has been finalized.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Whether the inner chain failed or panicked.
    pub fn failed(&self) -> bool {
        self.failed
    }

    /// How many times a response was finalized for this request.
    ///
    /// Anything other than 1 after dispatch is a pipeline bug; tests lean on
    /// this counter to verify the exactly-once invariant.
    pub fn writes(&self) -> u32 {
        self.writes
    }

    pub(crate) fn mark_failed(&mut self) {
        self.failed = true;
    }

    /// Records the finalized response status. A second call is a contract
    /// violation: it is logged and the first status is kept.
    pub(crate) fn record_written(&mut self, status: StatusCode) {
        self.writes += 1;
        if self.writes > 1 {
            error!(
                kept = %self.status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                rejected = %status,
                "response recorded twice for one request"
            );
            return;
        }
        self.status = Some(status);
    }
}
