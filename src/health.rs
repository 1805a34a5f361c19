//! Built-in health-check handlers.
//!
//! Register them like any other route — they run the full pipeline, so
//! health probes show up in the request log and metrics like real traffic:
//!
//! ```rust,no_run
//! use http::Method;
//! use trellis::{Router, health};
//!
//! let app = Router::new()
//!     .on(Method::GET, "/healthz", health::liveness)
//!     .on(Method::GET, "/readyz", health::readiness);
//! ```
//!
//! Replace `readiness` with your own handler to gate on dependency health
//! (database connectivity, downstream services) — return a `Fault` and the
//! pipeline answers with the matching status.

use http::StatusCode;
use serde::Serialize;

use crate::fault::Fault;
use crate::reply::Reply;
use crate::request::Request;

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

/// Liveness probe handler.
///
/// Always `200 {"status":"ok"}`. If the process can answer HTTP at all, it
/// is alive — this handler intentionally has no dependencies.
pub async fn liveness(_req: Request) -> Result<Reply, Fault> {
    Reply::json(&Health { status: "ok" }, StatusCode::OK)
}

/// Readiness probe handler (default implementation).
///
/// Always `200 {"status":"ready"}`. Override when the application needs a
/// warm-up period or must verify dependencies before taking traffic.
pub async fn readiness(_req: Request) -> Result<Reply, Fault> {
    Reply::json(&Health { status: "ready" }, StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[tokio::test]
    async fn liveness_reports_ok() {
        let reply = liveness(Request::builder(Method::GET, "/healthz").build())
            .await
            .unwrap();
        assert_eq!(reply.status_code(), StatusCode::OK);
        assert_eq!(reply.body(), br#"{"status":"ok"}"#);
    }
}
