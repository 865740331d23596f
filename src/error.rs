//! Crate-level error type.

use thiserror::Error;

use crate::crypto::CryptoError;

/// Errors surfaced by the API client.
#[derive(Debug, Error)]
pub enum Error {
    /// A cryptographic operation failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// The HTTP transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// An endpoint URL could not be built.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// A body failed to serialize or a response failed to parse.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The engine violated the wire protocol.
    #[error("{0}")]
    Protocol(String),

    /// The key exchange did not produce a shared key.
    #[error("key exchange failed: {0}")]
    KeyExchange(String),
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;
