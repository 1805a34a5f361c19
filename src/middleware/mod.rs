//! Middleware layer.
//!
//! A middleware stage wraps everything inside it: it sees the request on
//! the way in, the outcome on the way out, and decides whether to pass
//! either along unchanged. Stages are composed into an ordered list once at
//! route-registration time; per request, [`Next`] just walks that list.
//!
//! The process-wide order is fixed and load-bearing:
//!
//! 1. [`RequestLogger`] — outermost, so it observes the fully settled
//!    [`RequestState`] (status code, failure flag) after every inner stage
//!    has finished.
//! 2. [`Metrics`] — counts completed requests and failures.
//! 3. [`ErrorHandling`] — innermost process-wide stage, so it is the first
//!    failure boundary above route middleware and the handler. It absorbs
//!    panics and faults and guarantees exactly one response.
//!
//! Route-specific stages (for example [`RequireAuth`]) sit inside
//! `ErrorHandling`, closest to the handler, so their faults are translated
//! like any other.
//!
//! Implementing a stage:
//!
//! ```rust
//! use trellis::middleware::{BoxFuture, Middleware, Next};
//! use trellis::{Fault, Reply, Request, RequestState};
//!
//! struct ServerHeader;
//!
//! impl Middleware for ServerHeader {
//!     fn name(&self) -> &'static str {
//!         "server_header"
//!     }
//!
//!     fn around<'a>(
//!         &'a self,
//!         state: &'a mut RequestState,
//!         req: Request,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, Result<Reply, Fault>> {
//!         Box::pin(async move {
//!             let reply = next.run(state, req).await?;
//!             Ok(reply.header("server", "trellis"))
//!         })
//!     }
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::fault::Fault;
use crate::handler::BoxedHandler;
use crate::reply::Reply;
use crate::request::Request;
use crate::state::RequestState;

pub mod auth;
pub mod errors;
pub mod logger;
pub mod metrics;

pub use auth::{Authenticator, Principal, RequireAuth};
pub use errors::ErrorHandling;
pub use logger::RequestLogger;
pub use metrics::Metrics;

/// A boxed future borrowing from its middleware stage.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A cross-cutting stage in the request pipeline.
///
/// Stages must call [`Next::run`] exactly once unless they short-circuit
/// with their own outcome, and must propagate faults outward rather than
/// swallow them — translation happens only in [`ErrorHandling`].
pub trait Middleware: Send + Sync + 'static {
    /// Stage name, used in logs and debugging.
    fn name(&self) -> &'static str;

    /// Runs this stage around the rest of the chain.
    fn around<'a>(
        &'a self,
        state: &'a mut RequestState,
        req: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<Reply, Fault>>;
}

/// The remainder of a route's pipeline: the stages not yet run, ending at
/// the route handler.
///
/// Consumed by [`run`](Next::run), so a stage cannot invoke the inner chain
/// twice.
pub struct Next<'a> {
    stages: &'a [Arc<dyn Middleware>],
    handler: &'a BoxedHandler,
}

impl<'a> Next<'a> {
    pub(crate) fn new(stages: &'a [Arc<dyn Middleware>], handler: &'a BoxedHandler) -> Self {
        Self { stages, handler }
    }

    /// Runs the next stage, or the handler if every stage has run.
    pub async fn run(self, state: &mut RequestState, req: Request) -> Result<Reply, Fault> {
        match self.stages.split_first() {
            Some((stage, rest)) => {
                let next = Next { stages: rest, handler: self.handler };
                stage.around(state, req, next).await
            }
            None => self.handler.call(req).await,
        }
    }
}
