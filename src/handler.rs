//! Handler trait and type erasure.
//!
//! The router stores handlers of *different* concrete types in one routing
//! table, so each handler is erased behind `Arc<dyn ErasedHandler>` at
//! registration time. The per-request cost is one `Arc` clone and one
//! virtual call.
//!
//! The handler contract is structural: a handler returns either a [`Reply`]
//! (the one response for this request) or a [`Fault`] (no response written —
//! the error-handling stage produces it). The type system rules out the
//! "returned an error but also wrote a response" class of bug the contract
//! would otherwise have to police at runtime.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::fault::Fault;
use crate::reply::Reply;
use crate::request::Request;

/// A heap-allocated, type-erased future. `Send + 'static` so tokio can move
/// it across worker threads.
pub(crate) type HandlerFuture = Pin<Box<dyn Future<Output = Result<Reply, Fault>> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> HandlerFuture;
}

/// A type-erased handler shared across concurrent requests.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

/// Implemented for every valid route handler.
///
/// You never implement this yourself. It is automatically satisfied for any
/// `async fn` (or closure returning a `'static` future) with the signature:
///
/// ```text
/// async fn name(req: Request) -> Result<Reply, Fault>
/// ```
///
/// The trait is sealed: only the blanket impl below can satisfy it, which
/// keeps the dispatch machinery free to change without breaking callers.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Reply, Fault>> + Send + 'static,
{
}

impl<F, Fut> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Reply, Fault>> + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

/// Newtype bridging a concrete handler `F` into the trait-object world.
struct FnHandler<F>(F);

impl<F, Fut> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Reply, Fault>> + Send + 'static,
{
    fn call(&self, req: Request) -> HandlerFuture {
        Box::pin((self.0)(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, StatusCode};

    async fn ok_handler(_req: Request) -> Result<Reply, Fault> {
        Ok(Reply::status(StatusCode::NO_CONTENT))
    }

    #[tokio::test]
    async fn erased_handler_preserves_the_outcome() {
        let handler = ok_handler.into_boxed_handler();
        let req = Request::builder(Method::DELETE, "/users/1").build();
        let reply = handler.call(req).await.unwrap();
        assert_eq!(reply.status_code(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn closures_capturing_state_are_handlers() {
        let greeting = Arc::new("hello".to_owned());
        let captured = Arc::clone(&greeting);
        let handler = (move |_req: Request| {
            let greeting = Arc::clone(&captured);
            async move { Reply::json(&*greeting, StatusCode::OK) }
        })
        .into_boxed_handler();

        let req = Request::builder(Method::GET, "/greeting").build();
        let reply = handler.call(req).await.unwrap();
        assert_eq!(reply.body(), br#""hello""#);
    }
}
