//! Domain failure type and its translation to HTTP status codes.
//!
//! Business logic does not speak HTTP. It returns a [`Fault`] whose kind tag
//! tells the error-handling stage which response category to produce. The
//! five sentinel kinds get specific 4xx responses; everything else collapses
//! to a generic 500 whose cause is visible only in server-side logs.
//!
//! Wrapping a fault with [`Fault::context`] adds a message layer for the
//! logs without changing how it translates — [`Fault::kind`] always resolves
//! the root kind through any number of context layers.

use http::StatusCode;

/// Boxed error type used as the cause of an internal fault.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A failure raised by a handler or middleware stage.
///
/// The first five variants are the sentinel set recognized by the
/// translator. [`Fault::Internal`] carries any other error and always maps
/// to a generic 500. [`Fault::Context`] wraps another fault with an added
/// message; it is transparent to translation.
///
/// ```rust
/// use trellis::Fault;
///
/// fn lookup(id: &str) -> Result<u32, Fault> {
///     id.parse().map_err(|_| Fault::InvalidId)
/// }
///
/// let err = lookup("abc").unwrap_err().context("looking up order");
/// assert_eq!(err.kind(), trellis::FaultKind::InvalidId);
/// ```
#[derive(Debug, thiserror::Error)]
pub enum Fault {
    #[error("not found")]
    NotFound,
    #[error("invalid identifier")]
    InvalidId,
    #[error("authentication failure")]
    Unauthenticated,
    #[error("forbidden")]
    Forbidden,
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Internal(#[source] BoxError),
    #[error("{1}: {0}")]
    Context(#[source] Box<Fault>, String),
}

impl Fault {
    /// Wraps any error as an internal fault (translated to a 500).
    pub fn internal(err: impl Into<BoxError>) -> Self {
        Self::Internal(err.into())
    }

    /// A validation fault with a client-visible message (translated to 422).
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Adds a message layer for the logs. Does not affect translation.
    pub fn context(self, msg: impl Into<String>) -> Self {
        Self::Context(Box::new(self), msg.into())
    }

    /// The root kind, resolved through any context layers.
    pub fn kind(&self) -> FaultKind {
        match self {
            Self::NotFound => FaultKind::NotFound,
            Self::InvalidId => FaultKind::InvalidId,
            Self::Unauthenticated => FaultKind::Unauthenticated,
            Self::Forbidden => FaultKind::Forbidden,
            Self::Validation(_) => FaultKind::Validation,
            Self::Internal(_) => FaultKind::Internal,
            Self::Context(inner, _) => inner.kind(),
        }
    }

    /// The innermost fault, with context layers stripped.
    pub fn root(&self) -> &Fault {
        match self {
            Self::Context(inner, _) => inner.root(),
            other => other,
        }
    }

    /// The message safe to put in a response body.
    ///
    /// Sentinel faults describe themselves; internal causes never leak —
    /// the client sees only a fixed phrase while the real error goes to the
    /// server logs.
    pub fn client_message(&self) -> String {
        match self.root() {
            Self::Internal(_) => "internal server error".to_owned(),
            other => other.to_string(),
        }
    }
}

/// The closed set of response categories known to the translator.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FaultKind {
    NotFound,
    InvalidId,
    Unauthenticated,
    Forbidden,
    Validation,
    Internal,
}

impl FaultKind {
    /// Translates a fault kind to its HTTP status code.
    ///
    /// Total and infallible. `InvalidId` maps to 400 — one consistent
    /// mapping, distinct from both `NotFound` and the generic 500.
    pub fn status(self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::InvalidId => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
