use serde::Deserialize;
use thiserror::Error;

/// Errors surfaced by the client.
///
/// Compile-time/precondition failures (for example saving an object without
/// an id) travel through the same `Result` channel as network and server
/// failures, so callers never need a separate pre-dispatch error path.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Object has no objectId; it must be saved before field-level updates")]
    MissingObjectId,

    #[error("Object not found")]
    ObjectNotFound,

    #[error("{0}")]
    OtherCause(String),

    #[error("Server error {code}: {message}")]
    Server { code: i32, message: String },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// The server's structured error envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub code: i32,
    pub error: String,
}

impl Error {
    /// Decode a non-2xx response body into a structured server error when the
    /// envelope is present, otherwise fall back to a generic failure carrying
    /// the raw status and body.
    pub(crate) fn from_response(status: u16, body: &[u8]) -> Error {
        match serde_json::from_slice::<ErrorEnvelope>(body) {
            Ok(envelope) => Error::Server {
                code: envelope.code,
                message: envelope.error,
            },
            Err(_) => Error::OtherCause(format!(
                "HTTP {}: {}",
                status,
                String::from_utf8_lossy(body)
            )),
        }
    }

    pub(crate) fn decode(err: impl std::fmt::Display) -> Error {
        Error::Decode(err.to_string())
    }
}
