//! Infrastructure error type.

use std::fmt;

/// The error type returned by the server's fallible operations.
///
/// Request-level failures are [`Fault`](crate::Fault) values translated by
/// the pipeline; this type surfaces what the pipeline cannot answer for —
/// binding a port or accepting a connection.
#[derive(Debug)]
pub struct Error(std::io::Error);

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "io: {}", self.0)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self(e)
    }
}
