//! Incoming HTTP request type.

use std::collections::HashMap;
use std::net::SocketAddr;

use bytes::Bytes;
use http::{HeaderMap, Method};
use serde::de::DeserializeOwned;

use crate::fault::Fault;
use crate::middleware::auth::Principal;

/// An incoming HTTP request, with the body already collected.
pub struct Request {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Bytes,
    params: HashMap<String, String>,
    remote_addr: SocketAddr,
    principal: Option<Principal>,
}

impl Request {
    pub(crate) fn new(
        method: Method,
        path: String,
        headers: HeaderMap,
        body: Bytes,
        remote_addr: SocketAddr,
    ) -> Self {
        Self {
            method,
            path,
            headers,
            body,
            params: HashMap::new(),
            remote_addr,
            principal: None,
        }
    }

    /// Builder for constructing requests outside the server, mainly in
    /// tests and when embedding the router behind another transport.
    pub fn builder(method: Method, path: &str) -> RequestBuilder {
        RequestBuilder {
            method,
            path: path.to_owned(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            remote_addr: ([127, 0, 0, 1], 0).into(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Header lookup by name; non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Deserializes the JSON body.
    ///
    /// A body that does not parse into `T` is a validation fault — the
    /// client sent something the route cannot accept, and the pipeline
    /// answers 422 with the parse message.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Fault> {
        serde_json::from_slice(&self.body)
            .map_err(|e| Fault::validation(format!("invalid request body: {e}")))
    }

    /// A named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns
    /// `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// The authenticated principal, if an auth stage attached one.
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// Attaches an authenticated principal. Called by auth middleware.
    pub fn set_principal(&mut self, principal: Principal) {
        self.principal = Some(principal);
    }

    pub(crate) fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }
}

/// Builder returned by [`Request::builder`].
pub struct RequestBuilder {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Bytes,
    remote_addr: SocketAddr,
}

impl RequestBuilder {
    /// Adds a header. Invalid names or values are ignored rather than
    /// panicking; the builder exists for tests, not wire parsing.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            name.parse::<http::header::HeaderName>(),
            value.parse::<http::header::HeaderValue>(),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = addr;
        self
    }

    pub fn build(self) -> Request {
        Request::new(self.method, self.path, self.headers, self.body, self.remote_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let req = Request::builder(Method::GET, "/")
            .header("X-Trace-Id", "abc")
            .build();
        assert_eq!(req.header("x-trace-id"), Some("abc"));
    }

    #[test]
    fn malformed_json_body_is_a_validation_fault() {
        let req = Request::builder(Method::POST, "/users")
            .body(&b"{not json"[..])
            .build();
        let err = req.json::<serde_json::Value>().unwrap_err();
        assert_eq!(err.kind(), crate::FaultKind::Validation);
    }

    #[test]
    fn json_body_deserializes() {
        let req = Request::builder(Method::POST, "/users")
            .body(&br#"{"name":"alice"}"#[..])
            .build();
        let value: serde_json::Value = req.json().unwrap();
        assert_eq!(value["name"], "alice");
    }
}
