//! Request-completion logging stage.

use tracing::info;

use crate::fault::Fault;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::reply::Reply;
use crate::request::Request;
use crate::state::RequestState;

/// Emits one structured completion event per request.
///
/// Outermost process-wide stage: by the time the inner chain returns, the
/// error-handling stage has settled the status code and failure flag, so
/// the event reports what was actually written. Pure observation — the
/// inner outcome passes through unchanged.
pub struct RequestLogger;

impl Middleware for RequestLogger {
    fn name(&self) -> &'static str {
        "request_logger"
    }

    fn around<'a>(
        &'a self,
        state: &'a mut RequestState,
        req: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<Reply, Fault>> {
        Box::pin(async move {
            let method = req.method().clone();
            let path = req.path().to_owned();
            let remote = req.remote_addr();

            let outcome = next.run(state, req).await;

            info!(
                status = state.status().map_or(0_u16, |s| s.as_u16()),
                method = %method,
                path = %path,
                remote = %remote,
                elapsed_ms = state.started().elapsed().as_millis() as u64,
                failed = state.failed(),
                "request completed"
            );

            outcome
        })
    }
}
