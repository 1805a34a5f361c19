//! Radix-tree request router and pipeline composition.
//!
//! One `matchit` tree per HTTP method, O(path-length) lookup. Each route's
//! full stage list — the fixed process-wide stages followed by any
//! route-specific ones — is composed once at registration time; dispatch
//! only walks it. Registration happens at startup, before serving; the
//! router is immutable afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use http::{Method, StatusCode};
use http_body_util::Full;
use matchit::Router as MatchitRouter;
use tracing::error;

use crate::handler::{BoxedHandler, Handler};
use crate::middleware::{ErrorHandling, Metrics, Middleware, Next, RequestLogger};
use crate::reply::Reply;
use crate::request::Request;
use crate::state::RequestState;

/// A registered route: its composed stage list and handler.
#[derive(Clone)]
struct RouteTarget {
    stages: Arc<[Arc<dyn Middleware>]>,
    handler: BoxedHandler,
}

/// The application router.
///
/// Every route runs the process-wide stages in a fixed order — request
/// logger, metrics, error handling — then its own stages, then the handler.
/// The order is load-bearing: error handling must sit innermost among the
/// process-wide stages so it is the first to see a fault or panic from
/// route middleware or the handler, and the logger must sit outermost so it
/// reads the settled status code.
///
/// ```rust,no_run
/// use http::{Method, StatusCode};
/// use trellis::{Fault, Reply, Request, Router};
///
/// async fn get_user(req: Request) -> Result<Reply, Fault> {
///     let id: u32 = req.param("id")
///         .and_then(|v| v.parse().ok())
///         .ok_or(Fault::InvalidId)?;
///     Reply::json(&id, StatusCode::OK)
/// }
///
/// let app = Router::new().on(Method::GET, "/users/{id}", get_user);
/// ```
pub struct Router {
    routes: HashMap<Method, MatchitRouter<RouteTarget>>,
    global: Vec<Arc<dyn Middleware>>,
    metrics: Arc<Metrics>,
}

impl Router {
    pub fn new() -> Self {
        let metrics = Arc::new(Metrics::new());
        let global: Vec<Arc<dyn Middleware>> = vec![
            Arc::new(RequestLogger),
            Arc::clone(&metrics) as Arc<dyn Middleware>,
            Arc::new(ErrorHandling),
        ];
        Self { routes: HashMap::new(), global, metrics }
    }

    /// Registers a handler for a method + path pair. Returns `self` so
    /// registrations chain. Path parameters use `{name}` syntax.
    ///
    /// # Panics
    ///
    /// Panics on a malformed or conflicting path pattern — registration is
    /// startup code and a bad route table should stop the process.
    pub fn on(self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.on_with(method, path, handler, Vec::new())
    }

    /// Like [`on`](Router::on), with route-specific middleware wrapped
    /// closest to the handler — inside the process-wide stages.
    pub fn on_with(
        mut self,
        method: Method,
        path: &str,
        handler: impl Handler,
        route_stages: Vec<Arc<dyn Middleware>>,
    ) -> Self {
        let stages: Arc<[Arc<dyn Middleware>]> = self
            .global
            .iter()
            .cloned()
            .chain(route_stages)
            .collect::<Vec<_>>()
            .into();
        let target = RouteTarget { stages, handler: handler.into_boxed_handler() };
        self.routes
            .entry(method)
            .or_default()
            .insert(path, target)
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    /// Process-wide request counters.
    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    /// Runs one request through its route's pipeline and produces the wire
    /// response.
    ///
    /// An unmatched path answers 404 without entering any pipeline. If a
    /// fault somehow escapes the error-handling stage, that is a pipeline
    /// bug: it is logged and answered with a best-effort generic 500.
    pub async fn dispatch(&self, mut req: Request) -> http::Response<Full<Bytes>> {
        let Some((target, params)) = self.lookup(req.method(), req.path()) else {
            return Reply::failure(StatusCode::NOT_FOUND, "not found").into_http();
        };
        req.set_params(params);

        let mut state = RequestState::new();
        match Next::new(&target.stages, &target.handler).run(&mut state, req).await {
            Ok(reply) => reply.into_http(),
            Err(fault) => {
                error!(error = %fault, "fault escaped the middleware chain");
                Reply::failure(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
                    .into_http()
            }
        }
    }

    fn lookup(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(RouteTarget, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let params = matched
            .params
            .iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((matched.value.clone(), params))
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
