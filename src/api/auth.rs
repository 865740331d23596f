//! Handshake, password submission and request signing.
//!
//! The handshake posts the session's exchange public key to `auth` and
//! derives the shared key from the engine's reply. When the reply carries a
//! key salt, protected calls additionally need a password-derived public
//! key before the engine will accept their signatures.

use reqwest::Method;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::crypto;
use crate::error::Result;

use super::client::{ApiClient, Readiness};

/// Reply to the `auth` public-key exchange.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    public_key: String,
    #[serde(default)]
    key_salt: Option<String>,
    #[serde(default)]
    key_data: Option<String>,
}

/// One signing digest: `SHA256(method:path:key:nonce)`, unpadded base64url.
fn sign_digest(method: &Method, signing_path: &str, key: &str, nonce: u64) -> String {
    let input = format!("{}:{}:{}:{}", method.as_str(), signing_path, key, nonce);
    crypto::encode_b64url_nopad(&Sha256::digest(input.as_bytes()))
}

impl ApiClient {
    /// Run one key exchange and release every queued waiter, success or not.
    pub(super) async fn run_key_exchange(&self) {
        log::debug!("key exchange with {}", self.config.base_url());
        let established = self.post_auth().await;

        {
            let mut state = self.state.lock();
            state.exchange_in_flight = false;
            if let Some((shared, key_salt, key_data)) = established {
                state.shared = Some(shared);
                state.key_salt = key_salt;
                state.key_data = key_data;
            }
        }

        self.flush_waiters();
    }

    /// POST the exchange public key and derive the shared key.
    ///
    /// Failures are reported through the message sink here, except 404,
    /// which means the endpoint is not available yet rather than broken.
    async fn post_auth(
        &self,
    ) -> Option<(crypto::exchange::SharedKey, Option<String>, Option<String>)> {
        let url = match self.config.endpoint("auth") {
            Ok(url) => url,
            Err(error) => {
                self.report_error(&format!("Invalid API URL: {error}"));
                return None;
            }
        };

        let body = serde_json::json!({ "publicKey": self.exchange_public });
        let response = match self.http.post(url).json(&body).send().await {
            Ok(response) => response,
            Err(error) => {
                self.report_error(&format!("Key exchange failed: {error}"));
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            if status != reqwest::StatusCode::NOT_FOUND {
                let message = super::client::read_error_message(response).await;
                self.report_error(&message);
            }
            return None;
        }

        let auth: AuthResponse = match response.json().await {
            Ok(auth) => auth,
            Err(error) => {
                self.report_error(&format!("Key exchange failed: {error}"));
                return None;
            }
        };

        let server_public = match crypto::decode_b64(&auth.public_key) {
            Ok(bytes) => bytes,
            Err(error) => {
                self.report_error(&format!("Invalid server public key: {error}"));
                return None;
            }
        };
        let shared = match self.exchange.shared_key(&server_public) {
            Ok(shared) => shared,
            Err(error) => {
                self.report_error(&format!("Invalid server public key: {error}"));
                return None;
            }
        };

        if auth.key_salt.is_some() {
            log::debug!("engine requires a password-derived key");
        }

        Some((shared, auth.key_salt, auth.key_data))
    }

    /// Whether a password still has to be submitted.
    ///
    /// Returns `Some(true)` when the engine requires a password-derived key
    /// that has not been derived yet, `Some(false)` when calls can proceed,
    /// and `None` when the handshake is still pending and `wait` was false.
    pub async fn need_private_key_password(&self, wait: bool) -> Result<Option<bool>> {
        match self.ensure_ready(wait).await {
            Readiness::Ready { password_needed } => Ok(Some(password_needed)),
            Readiness::NotReady => Ok(None),
            Readiness::Failed => Err(crate::error::Error::KeyExchange(
                "key exchange did not complete".into(),
            )),
        }
    }

    /// Derive and install the password-derived public key.
    ///
    /// With no key salt on record the engine does not use password-based
    /// signing and any previous derived key is dropped. Either way, queued
    /// waiters are released.
    ///
    /// The derivation is deliberately expensive (memory-hard); it runs once
    /// per login, not per request.
    pub async fn submit_private_key_password(&self, password: &str) -> Result<()> {
        let (key_salt, key_data) = {
            let state = self.state.lock();
            (state.key_salt.clone(), state.key_data.clone())
        };

        match key_salt {
            None => {
                self.state.lock().encryption_public_key = None;
            }
            Some(key_salt) => {
                let derived = crypto::password::derive_encryption_public_key(
                    password,
                    &key_salt,
                    key_data.as_deref(),
                )?;
                log::debug!("derived encryption public key");
                self.state.lock().encryption_public_key = Some(derived);
            }
        }

        self.flush_waiters();
        Ok(())
    }

    /// Drop the password-derived key, e.g. on logout.
    pub fn clear_password(&self) {
        self.state.lock().encryption_public_key = None;
    }

    /// Build the signing header for one request.
    ///
    /// Increments the nonce, binds method, path and current key material,
    /// and appends a second digest under the password-derived key when one
    /// is installed. Returns `None` without a shared key.
    pub(super) fn generate_auth_header(&self, method: &Method, path: &str) -> Option<String> {
        let state = self.state.lock();
        let shared = state.shared.as_ref()?;

        let nonce = self
            .nonce
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst)
            + 1;
        let signing_path = self.config.signing_path(path);

        let digest = sign_digest(method, &signing_path, shared.base32(), nonce);
        let mut header = format!("{} {} {}", self.exchange_public, nonce, digest);

        if let Some(encryption_key) = state.encryption_public_key.as_deref() {
            let second = sign_digest(method, &signing_path, encryption_key, nonce);
            header.push(' ');
            header.push_str(&second);
        }

        Some(header)
    }
}
