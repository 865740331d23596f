//! Payload codec (AES-256-CBC + PKCS#7 with a plaintext SHA-256 tag).
//!
//! Wire format: IV (16 bytes) || ciphertext. The integrity tag is the
//! SHA-256 of the *plaintext*, transported separately as unpadded base64url
//! in the `x-payload-hash` header. This is the engine's format; note that a
//! plain hash is not a MAC, so the tag detects corruption but is not an
//! adversarial integrity boundary. The transport relies on TLS for that.

use aes::Aes256;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use super::{CryptoError, Result};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// IV length in bytes.
pub const IV_BYTES: usize = 16;

/// Symmetric key length in bytes.
pub const KEY_BYTES: usize = 32;

/// An encrypted payload plus its plaintext hash.
#[derive(Debug, Clone, PartialEq)]
pub struct EncryptedPayload {
    /// IV || ciphertext, the request or response body.
    pub data: Vec<u8>,
    /// Unpadded base64url SHA-256 of the plaintext.
    pub hash: String,
}

/// Compute the integrity tag for a plaintext.
pub fn payload_hash(plaintext: &[u8]) -> String {
    super::encode_b64url_nopad(&Sha256::digest(plaintext))
}

/// Encrypt a payload with a fresh random IV.
///
/// # Arguments
/// * `plaintext` - The serialized body bytes.
/// * `key` - 32-byte shared key.
///
/// # Returns
/// The wire body and its plaintext hash.
pub fn encrypt(plaintext: &[u8], key: &[u8]) -> Result<EncryptedPayload> {
    let mut iv = [0u8; IV_BYTES];
    OsRng.fill_bytes(&mut iv);
    encrypt_with_iv(plaintext, &iv, key)
}

/// Encrypt a payload with a provided IV.
///
/// Deterministic for fixed inputs; `encrypt` is the high-level API.
pub fn encrypt_with_iv(
    plaintext: &[u8],
    iv: &[u8; IV_BYTES],
    key: &[u8],
) -> Result<EncryptedPayload> {
    let cipher = Aes256CbcEnc::new_from_slices(key, iv).map_err(|_| {
        CryptoError::InvalidKeyLength {
            expected: KEY_BYTES,
            actual: key.len(),
        }
    })?;

    let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let mut data = Vec::with_capacity(IV_BYTES + ciphertext.len());
    data.extend_from_slice(iv);
    data.extend_from_slice(&ciphertext);

    Ok(EncryptedPayload {
        data,
        hash: payload_hash(plaintext),
    })
}

/// Decrypt a wire body and verify its plaintext hash.
///
/// # Arguments
/// * `data` - IV || ciphertext.
/// * `expected_hash` - The transported plaintext hash.
/// * `key` - 32-byte shared key.
///
/// # Returns
/// The plaintext, or [`CryptoError::PayloadHashMismatch`] if the recomputed
/// hash differs from the transported one.
pub fn decrypt(data: &[u8], expected_hash: &str, key: &[u8]) -> Result<Vec<u8>> {
    if data.len() < IV_BYTES {
        return Err(CryptoError::CiphertextTooShort {
            minimum: IV_BYTES,
            actual: data.len(),
        });
    }

    let (iv, ciphertext) = data.split_at(IV_BYTES);
    let cipher = Aes256CbcDec::new_from_slices(key, iv).map_err(|_| {
        CryptoError::InvalidKeyLength {
            expected: KEY_BYTES,
            actual: key.len(),
        }
    })?;

    let plaintext = cipher
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)?;

    let actual_hash = payload_hash(&plaintext);
    if !bool::from(actual_hash.as_bytes().ct_eq(expected_hash.as_bytes())) {
        return Err(CryptoError::PayloadHashMismatch);
    }

    Ok(plaintext)
}
