//! Password-derived encryption key.
//!
//! When the engine requires proof of password knowledge, the client derives
//! a second x25519 keypair from the password: Argon2i over the
//! server-provided key salt, optionally XORed with server-provided key
//! data, with the scalar bits forced into the pattern the engine expects.
//! Only the resulting public key ever leaves the process.

use argon2::{Algorithm, Argon2, Params, Version};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

use super::{CryptoError, Result};

/// Argon2 time cost (iterations).
pub const TIME_COST: u32 = 64;

/// Argon2 memory cost in KiB (8 MiB).
pub const MEMORY_COST_KIB: u32 = 8192;

/// Argon2 parallelism.
pub const PARALLELISM: u32 = 2;

/// Derived key length in bytes.
pub const KEY_BYTES: usize = 32;

/// Derive the encryption public key from a password.
///
/// Deterministic: the same password, salt and key data always produce the
/// same public key.
///
/// # Arguments
/// * `password` - The user's password.
/// * `key_salt` - Server-provided salt, fed to the KDF as transported.
/// * `key_data` - Optional server-provided key material, base32 encoded;
///   when present it is XORed into the derived bytes.
///
/// # Returns
/// The derived public key as an unpadded base32 string.
pub fn derive_encryption_public_key(
    password: &str,
    key_salt: &str,
    key_data: Option<&str>,
) -> Result<String> {
    let params = Params::new(MEMORY_COST_KIB, TIME_COST, PARALLELISM, Some(KEY_BYTES))
        .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?;
    derive_with_params(password, key_salt, key_data, params)
}

pub(crate) fn derive_with_params(
    password: &str,
    key_salt: &str,
    key_data: Option<&str>,
    params: Params,
) -> Result<String> {
    let argon = Argon2::new(Algorithm::Argon2i, Version::V0x13, params);

    let mut material = Zeroizing::new([0u8; KEY_BYTES]);
    argon
        .hash_password_into(
            password.as_bytes(),
            key_salt.as_bytes(),
            material.as_mut_slice(),
        )
        .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?;

    if let Some(key_data) = key_data {
        let key_data = super::decode_base32(key_data)?;
        if key_data.len() != KEY_BYTES {
            return Err(CryptoError::InvalidKeyLength {
                expected: KEY_BYTES,
                actual: key_data.len(),
            });
        }
        for (byte, data) in material.iter_mut().zip(&key_data) {
            *byte ^= data;
        }
    }

    force_scalar_bits(&mut material);

    let secret = StaticSecret::from(*material);
    let public = PublicKey::from(&secret);
    Ok(super::encode_base32(public.as_bytes()))
}

/// Force the derived bytes into the bit pattern the engine derives with.
///
/// This is the engine's convention, not the RFC 7748 clamp; the curve
/// library applies its own clamping again during scalar multiplication.
fn force_scalar_bits(bytes: &mut [u8; KEY_BYTES]) {
    bytes[0] |= 7;
    bytes[31] &= 63;
    bytes[31] |= 128;
}
