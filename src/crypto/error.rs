//! Crypto error types.

use thiserror::Error;

/// Errors produced by the cryptographic primitives.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// A key had the wrong length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },

    /// A public key could not be parsed.
    #[error("invalid public key")]
    InvalidPublicKey,

    /// Ciphertext shorter than the minimum the wire format allows.
    #[error("ciphertext too short: minimum {minimum}, got {actual}")]
    CiphertextTooShort {
        /// Minimum length in bytes.
        minimum: usize,
        /// Actual length in bytes.
        actual: usize,
    },

    /// Base64 decoding failed.
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Base32 or base64url decoding failed.
    #[error("invalid encoding: {0}")]
    Encoding(#[from] data_encoding::DecodeError),

    /// Password hashing failed.
    #[error("key derivation failed: {0}")]
    KeyDerivationFailed(String),

    /// Symmetric decryption or padding removal failed.
    #[error("decryption failed")]
    DecryptionFailed,

    /// The recomputed payload hash does not match the transported one.
    #[error("invalid response hash")]
    PayloadHashMismatch,
}

/// Result alias for crypto operations.
pub type Result<T> = std::result::Result<T, CryptoError>;
