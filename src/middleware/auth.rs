//! Bearer-token authentication stage.
//!
//! Route-specific middleware: attach it to the routes that need a caller
//! identity and leave public routes (health checks, token issuance) bare.
//! Token verification itself lives behind the [`Authenticator`] trait —
//! this stage only owns the HTTP side of the exchange.

use std::sync::Arc;

use crate::fault::Fault;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::reply::Reply;
use crate::request::Request;
use crate::state::RequestState;

/// An authenticated caller, attached to the request for handlers to read.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Principal {
    pub subject: String,
}

/// Verifies bearer tokens.
///
/// Implementations are shared read-only across concurrent requests and must
/// be safe for that by construction. Verification failures should be
/// [`Fault::Unauthenticated`]; use [`Fault::Forbidden`] when the token is
/// valid but the caller may not do this.
pub trait Authenticator: Send + Sync + 'static {
    fn authenticate(&self, token: &str) -> Result<Principal, Fault>;
}

/// Rejects requests without a valid `Authorization: Bearer <token>` header.
///
/// On success the resolved [`Principal`] rides along on the request:
///
/// ```rust,no_run
/// use trellis::{Fault, Reply, Request};
/// use http::StatusCode;
///
/// async fn whoami(req: Request) -> Result<Reply, Fault> {
///     let principal = req.principal().ok_or(Fault::Unauthenticated)?;
///     Reply::json(&principal.subject, StatusCode::OK)
/// }
/// ```
pub struct RequireAuth {
    authenticator: Arc<dyn Authenticator>,
}

impl RequireAuth {
    pub fn new(authenticator: Arc<dyn Authenticator>) -> Self {
        Self { authenticator }
    }
}

impl Middleware for RequireAuth {
    fn name(&self) -> &'static str {
        "require_auth"
    }

    fn around<'a>(
        &'a self,
        state: &'a mut RequestState,
        mut req: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<Reply, Fault>> {
        Box::pin(async move {
            let token = req
                .header("authorization")
                .and_then(|value| value.strip_prefix("Bearer "))
                .ok_or(Fault::Unauthenticated)?;

            let principal = self.authenticator.authenticate(token)?;
            req.set_principal(principal);

            next.run(state, req).await
        })
    }
}
