//! HTTP server and graceful shutdown.
//!
//! The transport edge of the framework: accepts connections, collects each
//! request body, and hands the request to the router's pipeline. Read/write
//! deadlines and cancellation live here (or in front of here), never inside
//! the pipeline — a request that has entered dispatch runs to its response.
//!
//! On SIGTERM or Ctrl-C the server stops accepting, lets every in-flight
//! connection task finish, and returns from [`Server::serve`].

use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::BodyExt;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::error::Error;
use crate::reply::Reply;
use crate::request::Request;
use crate::router::Router;

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// # Panics
    ///
    /// Panics if `addr` is not a valid `host:port` string — this is startup
    /// configuration, not request-time input.
    pub fn bind(addr: &str) -> Self {
        let addr: SocketAddr = addr.parse().expect("invalid socket address");
        Self { addr }
    }

    /// Starts accepting connections and dispatching them through `router`.
    ///
    /// Returns only after a full graceful shutdown: a signal, then every
    /// in-flight request completing.
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;

        // Shared across connection tasks; the routing table is read-only
        // after startup.
        let router = Arc::new(router);

        info!(addr = %self.addr, "listening");

        // JoinSet tracks every connection task so shutdown can drain them.
        let mut tasks = tokio::task::JoinSet::new();

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Check shutdown first so a signal immediately stops
                // accepting, even with connections queued.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let router = Arc::clone(&router);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on the connection.
                        let svc = service_fn(move |req| {
                            let router = Arc::clone(&router);
                            async move { handle(router, req, remote_addr).await }
                        });

                        // auto::Builder speaks HTTP/1.1 and HTTP/2, whichever
                        // the client negotiates.
                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished tasks so the JoinSet stays bounded.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("stopped");
        Ok(())
    }
}

/// Adapts one hyper request into the pipeline and back.
///
/// Infallible from hyper's point of view: every failure inside dispatch is
/// already a response, and a body that cannot be read answers 400 here.
async fn handle(
    router: Arc<Router>,
    req: hyper::Request<hyper::body::Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<http_body_util::Full<bytes::Bytes>>, std::convert::Infallible> {
    let (parts, body) = req.into_parts();

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            error!(peer = %remote_addr, "failed to read request body: {e}");
            return Ok(
                Reply::failure(http::StatusCode::BAD_REQUEST, "unreadable request body")
                    .into_http(),
            );
        }
    };

    let request = Request::new(
        parts.method,
        parts.uri.path().to_owned(),
        parts.headers,
        body,
        remote_addr,
    );

    Ok(router.dispatch(request).await)
}

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both SIGTERM (orchestrators) and SIGINT
/// (Ctrl-C, local dev). On other platforms only Ctrl-C is available.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let sigterm = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
