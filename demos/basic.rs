//! A small users service showing routing, sentinel faults, and per-route
//! authentication.
//!
//! ```sh
//! cargo run --example basic
//! curl localhost:3000/healthz
//! curl localhost:3000/users/1
//! curl localhost:3000/users/abc                       # 400 invalid identifier
//! curl localhost:3000/users/9                         # 404 not found
//! curl -X POST localhost:3000/users -d '{"name":"bob"}'   # 401
//! curl -X POST localhost:3000/users \
//!      -H 'authorization: Bearer letmein' -d '{"name":"bob"}'
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};

use trellis::middleware::{Authenticator, Principal, RequireAuth};
use trellis::{Fault, Reply, Request, Router, Server, health};

#[derive(Clone, Serialize)]
struct User {
    id: u32,
    name: String,
}

#[derive(Deserialize)]
struct NewUser {
    name: String,
}

type Store = Arc<Mutex<HashMap<u32, User>>>;

struct DemoToken;

impl Authenticator for DemoToken {
    fn authenticate(&self, token: &str) -> Result<Principal, Fault> {
        if token == "letmein" {
            Ok(Principal { subject: "demo".to_owned() })
        } else {
            Err(Fault::Unauthenticated)
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().init();

    let store: Store = Arc::new(Mutex::new(HashMap::from([(
        1,
        User { id: 1, name: "alice".to_owned() },
    )])));

    let auth = Arc::new(RequireAuth::new(Arc::new(DemoToken)));

    let get_store = Arc::clone(&store);
    let create_store = Arc::clone(&store);

    let app = Router::new()
        .on(Method::GET, "/healthz", health::liveness)
        .on(Method::GET, "/users/{id}", move |req: Request| {
            let store = Arc::clone(&get_store);
            async move { get_user(store, req).await }
        })
        .on_with(
            Method::POST,
            "/users",
            move |req: Request| {
                let store = Arc::clone(&create_store);
                async move { create_user(store, req).await }
            },
            vec![auth],
        );

    Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
}

async fn get_user(store: Store, req: Request) -> Result<Reply, Fault> {
    let id: u32 = req
        .param("id")
        .and_then(|v| v.parse().ok())
        .ok_or(Fault::InvalidId)?;
    let user = store
        .lock()
        .unwrap()
        .get(&id)
        .cloned()
        .ok_or(Fault::NotFound)?;
    Reply::json(&user, StatusCode::OK)
}

async fn create_user(store: Store, req: Request) -> Result<Reply, Fault> {
    let new_user: NewUser = req.json()?;
    if new_user.name.is_empty() {
        return Err(Fault::validation("name is required"));
    }

    let mut store = store.lock().unwrap();
    let id = store.keys().max().copied().unwrap_or(0) + 1;
    let user = User { id, name: new_user.name };
    store.insert(id, user.clone());

    Reply::json(&user, StatusCode::CREATED)
}
