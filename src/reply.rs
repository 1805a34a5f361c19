//! Outgoing response type.
//!
//! Handlers build a [`Reply`] and return it. The framework owns the wire:
//! a `Reply` becomes an `http::Response` only at the edge of dispatch, so
//! middleware can observe and rewrite it as a plain value.

use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;
use serde::Serialize;

use crate::fault::Fault;

/// An outgoing HTTP response: status, headers, JSON body.
///
/// ```rust
/// use http::StatusCode;
/// use serde::Serialize;
/// use trellis::Reply;
///
/// #[derive(Serialize)]
/// struct User { id: u32, name: &'static str }
///
/// # fn demo() -> Result<Reply, trellis::Fault> {
/// Reply::json(&User { id: 1, name: "alice" }, StatusCode::CREATED)
/// # }
/// ```
#[derive(Debug)]
pub struct Reply {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: Bytes,
}

impl Reply {
    /// A JSON response with the given status.
    ///
    /// Serialization failure is an internal fault — it means a business type
    /// cannot represent itself as JSON, which the generic 500 path reports.
    pub fn json<T: Serialize>(value: &T, status: StatusCode) -> Result<Self, Fault> {
        let body = serde_json::to_vec(value).map_err(Fault::internal)?;
        Ok(Self {
            status,
            headers: Vec::new(),
            body: Bytes::from(body),
        })
    }

    /// A response with no body.
    pub fn status(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// The `{"error": <message>}` failure body.
    ///
    /// Used by the error-handling stage and the router's unmatched-route
    /// path. The shape is stable: exactly one `error` key holding a string.
    pub fn failure(status: StatusCode, message: &str) -> Self {
        let body = serde_json::json!({ "error": message }).to_string();
        Self {
            status,
            headers: Vec::new(),
            body: Bytes::from(body),
        }
    }

    /// Adds a response header.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// The response status code.
    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    /// The response body bytes.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub(crate) fn into_http(self) -> http::Response<Full<Bytes>> {
        let mut builder = http::Response::builder()
            .status(self.status)
            .header(http::header::CONTENT_TYPE, "application/json");
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        // The only failure mode is an invalid header from handler code;
        // degrade to a bare 500 rather than unwind mid-connection.
        builder.body(Full::new(self.body)).unwrap_or_else(|_| {
            let mut res = http::Response::new(Full::new(Bytes::new()));
            *res.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            res
        })
    }
}
