//! End-to-end pipeline behavior: dispatch, translation, recovery, logging.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use http::{Method, StatusCode};
use http_body_util::BodyExt;
use tracing::Level;
use tracing::field::{Field, Visit};
use tracing_subscriber::Registry;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use trellis::middleware::{Authenticator, Principal, RequireAuth};
use trellis::{Fault, Reply, Request, Router};

// ── Log capture ───────────────────────────────────────────────────────────────

type Captured = Arc<Mutex<Vec<(Level, String)>>>;

struct CaptureLayer {
    events: Captured,
}

impl<S: tracing::Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut text = String::new();
        event.record(&mut TextVisitor(&mut text));
        self.events
            .lock()
            .unwrap()
            .push((*event.metadata().level(), text));
    }
}

struct TextVisitor<'a>(&'a mut String);

impl Visit for TextVisitor<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        use std::fmt::Write;
        let _ = write!(self.0, "{}={:?} ", field.name(), value);
    }
}

/// Installs a capturing subscriber for the current thread. Tests here run
/// on tokio's current-thread runtime, so every pipeline event lands in the
/// returned buffer while the guard lives.
fn capture_logs() -> (Captured, tracing::subscriber::DefaultGuard) {
    let events: Captured = Arc::new(Mutex::new(Vec::new()));
    let layer = CaptureLayer { events: Arc::clone(&events) };
    let guard = tracing::subscriber::set_default(Registry::default().with(layer));
    (events, guard)
}

fn logged_text(events: &Captured) -> String {
    events
        .lock()
        .unwrap()
        .iter()
        .map(|(_, text)| text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

fn error_level_count(events: &Captured) -> usize {
    events
        .lock()
        .unwrap()
        .iter()
        .filter(|(level, _)| *level == Level::ERROR)
        .count()
}

// ── Fixtures ──────────────────────────────────────────────────────────────────

async fn body_of(res: http::Response<http_body_util::Full<Bytes>>) -> String {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn failing_app(fault: fn() -> Fault) -> Router {
    Router::new().on(Method::GET, "/fail", move |_req: Request| async move {
        Err::<Reply, _>(fault())
    })
}

async fn status_for(fault: fn() -> Fault) -> StatusCode {
    let app = failing_app(fault);
    let res = app.dispatch(Request::builder(Method::GET, "/fail").build()).await;
    res.status()
}

// ── Sentinel translation over the wire ────────────────────────────────────────

#[tokio::test]
async fn sentinel_faults_map_to_their_documented_statuses() {
    assert_eq!(status_for(|| Fault::NotFound).await, StatusCode::NOT_FOUND);
    assert_eq!(status_for(|| Fault::InvalidId).await, StatusCode::BAD_REQUEST);
    assert_eq!(status_for(|| Fault::Unauthenticated).await, StatusCode::UNAUTHORIZED);
    assert_eq!(status_for(|| Fault::Forbidden).await, StatusCode::FORBIDDEN);
    assert_eq!(
        status_for(|| Fault::validation("name is required")).await,
        StatusCode::UNPROCESSABLE_ENTITY
    );
    assert_eq!(
        status_for(|| Fault::internal(std::io::Error::other("boom"))).await,
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[tokio::test]
async fn failure_bodies_have_the_stable_error_shape() {
    let app = failing_app(|| Fault::NotFound);
    let res = app.dispatch(Request::builder(Method::GET, "/fail").build()).await;
    assert_eq!(body_of(res).await, r#"{"error":"not found"}"#);
}

#[tokio::test]
async fn not_found_is_not_logged_at_error_level() {
    let (events, _guard) = capture_logs();
    let app = failing_app(|| Fault::NotFound);
    let res = app.dispatch(Request::builder(Method::GET, "/fail").build()).await;

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_level_count(&events), 0);
    assert!(!logged_text(&events).contains("request rejected"));
    // The completion line still reports the failure.
    assert!(logged_text(&events).contains("failed=true"));
}

#[tokio::test]
async fn unrecognized_errors_are_logged_but_never_leaked() {
    let (events, _guard) = capture_logs();
    let app = failing_app(|| Fault::internal(std::io::Error::other("disk full")));
    let res = app.dispatch(Request::builder(Method::GET, "/fail").build()).await;

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_of(res).await;
    assert!(!body.contains("disk full"));
    assert!(body.contains("internal server error"));

    assert!(error_level_count(&events) >= 1);
    assert!(logged_text(&events).contains("disk full"));
}

// ── Panic recovery ────────────────────────────────────────────────────────────

#[tokio::test]
async fn a_panicking_handler_answers_500_and_the_router_survives() {
    let (events, _guard) = capture_logs();
    let app = Router::new()
        .on(Method::GET, "/boom", |_req: Request| async {
            if true {
                panic!("nil pointer");
            }
            Ok::<Reply, Fault>(Reply::status(StatusCode::OK))
        })
        .on(Method::GET, "/ok", |_req: Request| async {
            Ok::<Reply, Fault>(Reply::status(StatusCode::OK))
        });

    let res = app.dispatch(Request::builder(Method::GET, "/boom").build()).await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let text = logged_text(&events);
    assert!(text.contains("nil pointer"));
    assert!(text.contains("panic recovered"));
    assert!(text.contains("stack="));

    // The same router keeps serving.
    let res = app.dispatch(Request::builder(Method::GET, "/ok").build()).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(app.metrics().requests(), 2);
    assert_eq!(app.metrics().failures(), 1);
}

// ── Completion logging ────────────────────────────────────────────────────────

#[tokio::test]
async fn the_completion_line_reports_the_written_status() {
    let (events, _guard) = capture_logs();
    let app = Router::new().on(Method::POST, "/users", |req: Request| async move {
        let body: serde_json::Value = req.json()?;
        Reply::json(&body, StatusCode::CREATED)
    });

    let res = app
        .dispatch(
            Request::builder(Method::POST, "/users")
                .body(&br#"{"name":"alice"}"#[..])
                .build(),
        )
        .await;

    assert_eq!(res.status(), StatusCode::CREATED);
    let text = logged_text(&events);
    assert!(text.contains("request completed"));
    assert!(text.contains("status=201"));
    assert!(text.contains("failed=false"));
}

#[tokio::test]
async fn a_malformed_body_is_answered_with_422() {
    let app = Router::new().on(Method::POST, "/users", |req: Request| async move {
        let body: serde_json::Value = req.json()?;
        Reply::json(&body, StatusCode::CREATED)
    });

    let res = app
        .dispatch(Request::builder(Method::POST, "/users").body(&b"{oops"[..]).build())
        .await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// ── Route-specific auth middleware ────────────────────────────────────────────

struct StaticToken;

impl Authenticator for StaticToken {
    fn authenticate(&self, token: &str) -> Result<Principal, Fault> {
        if token == "letmein" {
            Ok(Principal { subject: "alice".to_owned() })
        } else {
            Err(Fault::Unauthenticated)
        }
    }
}

fn authed_app() -> Router {
    Router::new().on_with(
        Method::GET,
        "/whoami",
        |req: Request| async move {
            let principal = req.principal().ok_or(Fault::Unauthenticated)?;
            Reply::json(&principal.subject, StatusCode::OK)
        },
        vec![Arc::new(RequireAuth::new(Arc::new(StaticToken)))],
    )
}

#[tokio::test]
async fn an_unauthenticated_request_is_401() {
    let app = authed_app();
    let res = app.dispatch(Request::builder(Method::GET, "/whoami").build()).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_of(res).await, r#"{"error":"authentication failure"}"#);
}

#[tokio::test]
async fn an_authenticated_request_sees_its_principal() {
    let app = authed_app();
    let res = app
        .dispatch(
            Request::builder(Method::GET, "/whoami")
                .header("authorization", "Bearer letmein")
                .build(),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_of(res).await, r#""alice""#);
}
