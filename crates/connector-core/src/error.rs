//! Error types for the connector pipeline.

use thiserror::Error;

/// Failure reported by a persistent key/value store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be read or written.
    #[error("store backend error: {0}")]
    Backend(String),

    /// A stored value could not be (de)serialized.
    #[error("store value error: {0}")]
    Value(#[from] serde_json::Error),
}

/// Failure of a call into the browser host.
#[derive(Debug, Error)]
pub enum HostError {
    /// The host answered the call with an error.
    #[error("host call failed: {0}")]
    Call(String),

    /// The host went away before answering.
    #[error("host disconnected")]
    Disconnected,

    /// The host answered with something that does not fit the contract.
    #[error("unexpected host reply: {0}")]
    Protocol(String),
}

/// Failure to reach the companion app over HTTP.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection refused, timeout, DNS failure and friends.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Used by in-process transports that have no reqwest error to carry.
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// Top-level error for connector operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Key/value store failure.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Host capability failure.
    #[error("host error: {0}")]
    Host(#[from] HostError),

    /// HTTP client setup failure.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// JSON serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for connector operations.
pub type Result<T> = std::result::Result<T, CoreError>;
