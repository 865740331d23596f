//! Key exchange primitives.
//!
//! Each session owns one x25519 keypair, generated at construction and kept
//! for the whole session (401-triggered re-handshakes reuse it). The shared
//! key derived against the engine's public key doubles as the symmetric
//! payload key and, in base32 form, as signing material.

use rand_core::OsRng;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::{CryptoError, Result};

/// Public key length (32 bytes).
pub const PUBLIC_KEY_BYTES: usize = 32;

/// Symmetric key derived from the exchange.
///
/// Invariant: an instance only exists after a completed handshake.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SharedKey {
    bytes: [u8; 32],
    base32: String,
}

impl SharedKey {
    /// Wrap raw shared-secret bytes, precomputing the base32 form.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        let base32 = super::encode_base32(&bytes);
        SharedKey { bytes, base32 }
    }

    /// Raw key bytes, used as the symmetric payload key.
    pub fn bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Unpadded base32 form, used in request signing strings.
    pub fn base32(&self) -> &str {
        &self.base32
    }
}

/// The session's x25519 exchange keypair.
pub struct ExchangeKeyPair {
    secret: StaticSecret,
    public: PublicKey,
}

impl ExchangeKeyPair {
    /// Generate a fresh keypair from the system RNG.
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        ExchangeKeyPair { secret, public }
    }

    /// The public half as unpadded URL-safe base64, as posted to the engine.
    pub fn public_key_b64url(&self) -> String {
        super::encode_b64url_nopad(self.public.as_bytes())
    }

    /// Derive the shared symmetric key against the engine's public key.
    ///
    /// # Arguments
    /// * `server_public` - The engine's 32-byte x25519 public key.
    ///
    /// # Returns
    /// The shared key in raw and base32 forms.
    pub fn shared_key(&self, server_public: &[u8]) -> Result<SharedKey> {
        if server_public.len() != PUBLIC_KEY_BYTES {
            return Err(CryptoError::InvalidKeyLength {
                expected: PUBLIC_KEY_BYTES,
                actual: server_public.len(),
            });
        }

        let mut key = [0u8; PUBLIC_KEY_BYTES];
        key.copy_from_slice(server_public);
        let server_public = PublicKey::from(key);

        let shared = self.secret.diffie_hellman(&server_public);
        Ok(SharedKey::from_bytes(*shared.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypairs_are_unique() {
        let a = ExchangeKeyPair::generate();
        let b = ExchangeKeyPair::generate();
        assert_ne!(a.public_key_b64url(), b.public_key_b64url());
    }

    #[test]
    fn test_public_key_encoding() {
        let pair = ExchangeKeyPair::generate();
        let encoded = pair.public_key_b64url();
        assert!(!encoded.contains('='));
        let decoded = crate::crypto::decode_b64url_nopad(&encoded).unwrap();
        assert_eq!(decoded.len(), PUBLIC_KEY_BYTES);
    }

    #[test]
    fn test_shared_key_agreement() {
        let client = ExchangeKeyPair::generate();
        let server = ExchangeKeyPair::generate();

        let client_side = client.shared_key(server.public.as_bytes()).unwrap();
        let server_side = server.shared_key(client.public.as_bytes()).unwrap();

        assert_eq!(client_side.bytes(), server_side.bytes());
        assert_eq!(client_side.base32(), server_side.base32());
    }

    #[test]
    fn test_base32_form_matches_bytes() {
        let key = SharedKey::from_bytes([7u8; 32]);
        let decoded = crate::crypto::decode_base32(key.base32()).unwrap();
        assert_eq!(decoded, key.bytes());
    }

    #[test]
    fn test_invalid_server_key_length() {
        let pair = ExchangeKeyPair::generate();
        let result = pair.shared_key(&[0u8; 16]);
        assert!(matches!(
            result,
            Err(CryptoError::InvalidKeyLength { .. })
        ));
    }
}
