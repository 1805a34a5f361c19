//! # trellis
//!
//! A small middleware-first HTTP service framework.
//!
//! trellis is the part of a service that stays the same while the business
//! logic changes: how a request is dispatched to a handler, how per-request
//! state flows through an ordered chain of cross-cutting stages, and how
//! every internal failure — expected or not — becomes one uniform JSON
//! error response.
//!
//! ## The pipeline
//!
//! Every route runs the same fixed process-wide stages, outermost first:
//!
//! 1. **Request logger** — one structured completion event per request,
//!    emitted after everything inside has settled.
//! 2. **Metrics** — request and failure counters.
//! 3. **Error handling** — the failure boundary. Catches panics, translates
//!    [`Fault`]s to status codes, and guarantees exactly one response.
//!
//! Route-specific stages (authentication, usually) wrap the handler inside
//! all of these, so their failures are translated like any other.
//!
//! ## Handlers and faults
//!
//! A handler is any `async fn(Request) -> Result<Reply, Fault>`. Success
//! means "here is the one response for this request"; failure means "no
//! response yet — translate this". Business code raises the sentinel kinds
//! ([`Fault::NotFound`], [`Fault::InvalidId`], [`Fault::Unauthenticated`],
//! [`Fault::Forbidden`], [`Fault::Validation`]) to pick a 4xx category;
//! anything else becomes a 500 whose cause appears only in the server logs.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use http::{Method, StatusCode};
//! use trellis::{Fault, Reply, Request, Router, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = Router::new()
//!         .on(Method::GET, "/users/{id}", get_user)
//!         .on(Method::GET, "/healthz", trellis::health::liveness);
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn get_user(req: Request) -> Result<Reply, Fault> {
//!     let id: u32 = req.param("id")
//!         .and_then(|v| v.parse().ok())
//!         .ok_or(Fault::InvalidId)?;
//!     if id != 1 {
//!         return Err(Fault::NotFound);
//!     }
//!     Reply::json(&serde_json::json!({ "id": id, "name": "alice" }), StatusCode::OK)
//! }
//! ```

mod error;
mod fault;
mod handler;
mod reply;
mod request;
mod router;
mod server;
mod state;

pub mod health;
pub mod middleware;

pub use error::Error;
pub use fault::{BoxError, Fault, FaultKind};
pub use handler::Handler;
pub use reply::Reply;
pub use request::{Request, RequestBuilder};
pub use router::Router;
pub use server::Server;
pub use state::RequestState;
