use thiserror::Error;

/// Failure of one request against the dashboard API.
///
/// Cloneable so a single failed fetch can be handed to every de-duplicated
/// caller and kept on the cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// No response was obtained.
    #[error("network error: {0}")]
    Network(String),
    /// The server rejected the session (HTTP 401).
    #[error("session is not authorized")]
    Unauthorized,
    #[error("server returned {status}: {message}")]
    Http { status: u16, message: String },
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// The task driving the request ended without a response.
    #[error("request aborted: {0}")]
    Aborted(String),
}

impl TransportError {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }
}
