//! Error-handling and panic-recovery stage.
//!
//! The innermost process-wide stage and the pipeline's only failure
//! boundary. Whatever happens below it — a fault from route middleware or
//! the handler, or an outright panic — exactly one response comes back up,
//! and nothing but `Ok` propagates outward.

use std::any::Any;
use std::backtrace::Backtrace;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use tracing::{error, info};

use crate::fault::{Fault, FaultKind};
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::reply::Reply;
use crate::request::Request;
use crate::state::RequestState;

/// Absorbs panics and faults from the inner chain and writes the response.
///
/// - A panic marks the state failed, logs the panic payload and a captured
///   backtrace at error level, and answers a generic 500. The request
///   completes normally from the server's point of view.
/// - A returned fault marks the state failed and is translated by its root
///   kind. `NotFound` is expected traffic and logged at no severity; other
///   sentinels log at info; internal faults log the full context chain at
///   error. The client body never carries an internal cause.
/// - A success passes through untouched.
///
/// In every case the finalized status is recorded into [`RequestState`]
/// exactly once, which is what the request logger reports.
pub struct ErrorHandling;

impl Middleware for ErrorHandling {
    fn name(&self) -> &'static str {
        "error_handling"
    }

    fn around<'a>(
        &'a self,
        state: &'a mut RequestState,
        req: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<Reply, Fault>> {
        Box::pin(async move {
            let outcome = AssertUnwindSafe(next.run(state, req)).catch_unwind().await;

            let reply = match outcome {
                Ok(Ok(reply)) => reply,
                Ok(Err(fault)) => {
                    state.mark_failed();
                    let kind = fault.kind();
                    match kind {
                        // Expected traffic, not worth a log line.
                        FaultKind::NotFound => {}
                        FaultKind::Internal => error!(error = %fault, "request failed"),
                        _ => info!(error = %fault, "request rejected"),
                    }
                    Reply::failure(kind.status(), &fault.client_message())
                }
                Err(panic) => {
                    state.mark_failed();
                    error!(
                        panic = %panic_message(&*panic),
                        stack = %Backtrace::force_capture(),
                        "panic recovered"
                    );
                    Reply::failure(
                        http::StatusCode::INTERNAL_SERVER_ERROR,
                        "internal server error",
                    )
                }
            };

            state.record_written(reply.status_code());
            Ok(reply)
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Handler;
    use http::{Method, StatusCode};
    use std::sync::Arc;

    async fn run_chain(
        handler: impl Handler,
    ) -> (RequestState, Result<Reply, Fault>) {
        let stages: Vec<Arc<dyn Middleware>> = vec![Arc::new(ErrorHandling)];
        let handler = handler.into_boxed_handler();
        let mut state = RequestState::new();
        let req = Request::builder(Method::GET, "/probe").build();
        let outcome = Next::new(&stages, &handler).run(&mut state, req).await;
        (state, outcome)
    }

    #[tokio::test]
    async fn success_passes_through_and_records_the_status() {
        let (state, outcome) =
            run_chain(|_req: Request| async { Ok::<Reply, Fault>(Reply::status(StatusCode::CREATED)) })
                .await;
        let reply = outcome.unwrap();
        assert_eq!(reply.status_code(), StatusCode::CREATED);
        assert!(!state.failed());
        assert_eq!(state.status(), Some(StatusCode::CREATED));
        assert_eq!(state.writes(), 1);
    }

    #[tokio::test]
    async fn a_sentinel_fault_becomes_its_status() {
        let (state, outcome) =
            run_chain(|_req: Request| async { Err::<Reply, _>(Fault::Forbidden) }).await;
        let reply = outcome.unwrap();
        assert_eq!(reply.status_code(), StatusCode::FORBIDDEN);
        assert!(state.failed());
        assert_eq!(state.writes(), 1);
    }

    #[tokio::test]
    async fn a_wrapped_fault_translates_by_its_root() {
        let (_, outcome) = run_chain(|_req: Request| async {
            Err::<Reply, _>(Fault::NotFound.context("loading user"))
        })
        .await;
        assert_eq!(outcome.unwrap().status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn an_internal_cause_stays_out_of_the_body() {
        let (_, outcome) = run_chain(|_req: Request| async {
            Err::<Reply, _>(Fault::internal(std::io::Error::other("disk full")))
        })
        .await;
        let reply = outcome.unwrap();
        assert_eq!(reply.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = String::from_utf8(reply.body().to_vec()).unwrap();
        assert!(!body.contains("disk full"));
        assert!(body.contains("internal server error"));
    }

    #[tokio::test]
    async fn a_panic_is_absorbed_into_a_500() {
        let (state, outcome) = run_chain(|_req: Request| async {
            if true {
                panic!("nil pointer");
            }
            Ok::<Reply, Fault>(Reply::status(StatusCode::OK))
        })
        .await;
        let reply = outcome.expect("the boundary must not re-raise");
        assert_eq!(reply.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(state.failed());
        assert_eq!(state.writes(), 1);
    }

    #[test]
    fn panic_payload_messages_are_extracted() {
        let boxed: Box<dyn Any + Send> = Box::new("static str");
        assert_eq!(panic_message(&*boxed), "static str");
        let boxed: Box<dyn Any + Send> = Box::new("owned".to_owned());
        assert_eq!(panic_message(&*boxed), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(17_u8);
        assert_eq!(panic_message(&*boxed), "non-string panic payload");
    }
}
