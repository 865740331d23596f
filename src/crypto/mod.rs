//! Cryptographic primitives for the Keelback wire protocol.
//!
//! Pure Rust implementation. The wire encodings mirror what the engine
//! emits: standard base64 for exchanged public keys, unpadded base64url for
//! digests, unpadded base32 for key material in signing strings.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use data_encoding::{BASE32_NOPAD, BASE64URL_NOPAD};

mod error;

pub mod exchange;
pub mod password;
pub mod payload;

pub use error::{CryptoError, Result};

/// Decode a base64 string to bytes.
///
/// Accepts standard (`+`/`/`) or URL-safe (`-`/`_`) alphabets with or
/// without padding; the engine is not consistent about which it sends.
///
/// # Arguments
/// * `input` - Base64 encoded string.
///
/// # Returns
/// The decoded bytes.
pub fn decode_b64(input: &str) -> Result<Vec<u8>> {
    let mut normalized = input.replace('-', "+").replace('_', "/");
    while normalized.len() % 4 != 0 {
        normalized.push('=');
    }
    Ok(BASE64.decode(normalized)?)
}

/// Encode bytes to a standard base64 string (RFC 4648 §4).
pub fn encode_b64(input: &[u8]) -> String {
    BASE64.encode(input)
}

/// Encode bytes to an unpadded URL-safe base64 string (RFC 4648 §5).
///
/// Used for the exchange public key sent to the engine and for every
/// digest on the wire.
pub fn encode_b64url_nopad(input: &[u8]) -> String {
    BASE64URL_NOPAD.encode(input)
}

/// Decode an unpadded URL-safe base64 string to bytes.
pub fn decode_b64url_nopad(input: &str) -> Result<Vec<u8>> {
    Ok(BASE64URL_NOPAD.decode(input.trim_end_matches('=').as_bytes())?)
}

/// Encode bytes to an unpadded base32 string (RFC 4648 alphabet).
pub fn encode_base32(input: &[u8]) -> String {
    BASE32_NOPAD.encode(input)
}

/// Decode a base32 string to bytes.
///
/// Tolerates lowercase input and trailing padding.
pub fn decode_base32(input: &str) -> Result<Vec<u8>> {
    let normalized = input.trim_end_matches('=').to_ascii_uppercase();
    Ok(BASE32_NOPAD.decode(normalized.as_bytes())?)
}
