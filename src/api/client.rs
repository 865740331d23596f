//! The API session object.
//!
//! One `ApiClient` owns everything the protocol keeps mutable: the exchange
//! keypair, the shared key, the password-derived public key, the nonce
//! counter and the queue of callers waiting for the handshake. Nothing else
//! touches this state; every interaction goes through the async methods.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use tokio::sync::oneshot;

use crate::config::ClientConfig;
use crate::crypto::exchange::{ExchangeKeyPair, SharedKey};
use crate::crypto::payload;
use crate::error::{Error, Result};
use crate::notify::{LogMessageSink, MessageSink};

use super::outcome::Outcome;
use super::{ENCRYPTED_CONTENT_TYPE, KEY_EXCHANGE_HEADER, PAYLOAD_HASH_HEADER};

/// Per-call behavior switches.
#[derive(Debug, Clone, Copy)]
pub struct CallOptions {
    /// Wait for the handshake instead of returning [`Outcome::AuthPending`].
    pub wait: bool,
    /// Suppress user-visible error reporting for this call.
    pub silent: bool,
}

impl Default for CallOptions {
    fn default() -> Self {
        CallOptions {
            wait: true,
            silent: false,
        }
    }
}

/// Mutable authentication state, all behind one lock.
#[derive(Default)]
pub(super) struct AuthState {
    pub(super) shared: Option<SharedKey>,
    pub(super) key_salt: Option<String>,
    pub(super) key_data: Option<String>,
    pub(super) encryption_public_key: Option<String>,
    pub(super) exchange_in_flight: bool,
    pub(super) waiters: Vec<oneshot::Sender<()>>,
}

/// Result of the readiness gate every call passes through.
pub(super) enum Readiness {
    /// A shared key exists; `password_needed` is whether the engine still
    /// waits for a password-derived key.
    Ready { password_needed: bool },
    /// No shared key and the caller declined to wait.
    NotReady,
    /// The handshake was attempted and did not produce a key.
    Failed,
}

/// Authenticated, encrypting client for the engine's admin API.
pub struct ApiClient {
    pub(super) config: ClientConfig,
    pub(super) http: reqwest::Client,
    pub(super) exchange: ExchangeKeyPair,
    pub(super) exchange_public: String,
    pub(super) state: Mutex<AuthState>,
    pub(super) nonce: AtomicU64,
    pub(super) authenticated_once: AtomicBool,
    pub(super) sink: Arc<dyn MessageSink>,
}

impl ApiClient {
    /// Create a client; messages go to the `log` facade.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_message_sink(config, Arc::new(LogMessageSink))
    }

    /// Create a client with a custom message sink.
    pub fn with_message_sink(config: ClientConfig, sink: Arc<dyn MessageSink>) -> Result<Self> {
        let http = reqwest::Client::builder().build()?;
        let exchange = ExchangeKeyPair::generate();
        let exchange_public = exchange.public_key_b64url();

        Ok(ApiClient {
            config,
            http,
            exchange,
            exchange_public,
            state: Mutex::new(AuthState::default()),
            nonce: AtomicU64::new(0),
            authenticated_once: AtomicBool::new(false),
            sink,
        })
    }

    /// The session's exchange public key (unpadded base64url), exactly as
    /// posted to the engine's `auth` endpoint.
    pub fn exchange_public_key(&self) -> &str {
        &self.exchange_public
    }

    /// The configuration the client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Perform the initial key exchange.
    ///
    /// Calling this is optional; the first API call triggers the handshake
    /// on its own. It exists so applications can fail fast at startup.
    pub async fn connect(&self) -> Result<()> {
        match self.ensure_ready(true).await {
            Readiness::Failed => Err(Error::KeyExchange(
                "key exchange did not complete".into(),
            )),
            _ => Ok(()),
        }
    }

    /// Gate a call on handshake completion.
    ///
    /// Callers queue while an exchange is in flight and are released in
    /// order in one flush when it resolves. A caller woken by a failed
    /// exchange retries the handshake once before giving up.
    pub(super) async fn ensure_ready(&self, wait: bool) -> Readiness {
        enum Step {
            Ready(bool),
            NotReady,
            Wait(oneshot::Receiver<()>),
            Run,
        }

        for _attempt in 0..2 {
            let step = {
                let mut state = self.state.lock();
                if state.shared.is_some() {
                    Step::Ready(
                        state.key_salt.is_some() && state.encryption_public_key.is_none(),
                    )
                } else if !wait {
                    Step::NotReady
                } else if state.exchange_in_flight {
                    let (tx, rx) = oneshot::channel();
                    state.waiters.push(tx);
                    Step::Wait(rx)
                } else {
                    state.exchange_in_flight = true;
                    Step::Run
                }
            };

            match step {
                Step::Ready(password_needed) => {
                    return Readiness::Ready { password_needed };
                }
                Step::NotReady => return Readiness::NotReady,
                Step::Wait(rx) => {
                    let _ = rx.await;
                }
                Step::Run => self.run_key_exchange().await,
            }
        }

        let state = self.state.lock();
        match &state.shared {
            Some(_) => Readiness::Ready {
                password_needed: state.key_salt.is_some()
                    && state.encryption_public_key.is_none(),
            },
            None => Readiness::Failed,
        }
    }

    /// Snapshot the current symmetric key.
    pub(super) fn shared_key_bytes(&self) -> Option<[u8; 32]> {
        self.state.lock().shared.as_ref().map(|key| *key.bytes())
    }

    /// Release every queued waiter, in queue order.
    pub(super) fn flush_waiters(&self) {
        let waiters = std::mem::take(&mut self.state.lock().waiters);
        for waiter in waiters {
            let _ = waiter.send(());
        }
    }

    /// Report a user-visible error through the sink.
    pub(super) fn report_error(&self, message: &str) {
        self.sink.show_error(message);
    }

    /// The single choke point for all protected calls.
    ///
    /// Waits for auth readiness, signs, encrypts any body, sends, handles
    /// 401 by restarting the handshake, and decrypts and verifies the
    /// response.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<serde_json::Value>,
        options: CallOptions,
    ) -> Outcome<T> {
        let outcome = self.call_inner(method, path, body, options.wait).await;

        if !options.silent {
            match &outcome {
                Outcome::Failed(error) => self.sink.show_error(&error.to_string()),
                Outcome::Rejected { message, .. } => self.sink.show_error(message),
                _ => {}
            }
        }

        outcome
    }

    async fn call_inner<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<serde_json::Value>,
        wait: bool,
    ) -> Outcome<T> {
        match self.ensure_ready(wait).await {
            Readiness::Ready { .. } => {}
            Readiness::NotReady => return Outcome::AuthPending,
            Readiness::Failed => {
                return Outcome::Failed(Error::KeyExchange(
                    "key exchange did not complete".into(),
                ));
            }
        }

        let url = match self.config.endpoint(path) {
            Ok(url) => url,
            Err(error) => return Outcome::Failed(error.into()),
        };

        // The key can be cleared by a concurrent 401 between the readiness
        // check and signing; treat that like a pending handshake.
        let Some(header) = self.generate_auth_header(&method, path) else {
            return Outcome::AuthPending;
        };

        let mut request = self
            .http
            .request(method, url)
            .header(KEY_EXCHANGE_HEADER, header);

        if let Some(body) = body {
            let plaintext = match serde_json::to_vec(&body) {
                Ok(bytes) => bytes,
                Err(error) => return Outcome::Failed(error.into()),
            };
            let Some(key) = self.shared_key_bytes() else {
                return Outcome::AuthPending;
            };
            let encrypted = match payload::encrypt(&plaintext, &key) {
                Ok(encrypted) => encrypted,
                Err(error) => return Outcome::Failed(error.into()),
            };
            request = request
                .header(CONTENT_TYPE, ENCRYPTED_CONTENT_TYPE)
                .header(PAYLOAD_HASH_HEADER, encrypted.hash)
                .body(encrypted.data);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(error) => return Outcome::Failed(error.into()),
        };

        let status = response.status();
        log::debug!("{path}: {status}");

        if status == StatusCode::UNAUTHORIZED {
            self.handle_unauthorized().await;
            return Outcome::Unauthorized;
        }
        if status == StatusCode::NOT_FOUND {
            return Outcome::NotFound;
        }
        if !status.is_success() {
            let message = read_error_message(response).await;
            return Outcome::Rejected { status, message };
        }

        self.authenticated_once.store(true, Ordering::SeqCst);
        self.read_response(response).await
    }

    /// Decrypt and verify a successful response, tolerating only the plain
    /// informational `{message}` shape.
    async fn read_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Outcome<T> {
        let encrypted = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.starts_with(ENCRYPTED_CONTENT_TYPE))
            .unwrap_or(false);

        if encrypted {
            let Some(expected_hash) = response
                .headers()
                .get(PAYLOAD_HASH_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned)
            else {
                return Outcome::Failed(Error::Protocol(
                    "Encrypted response without payload hash".into(),
                ));
            };

            let data = match response.bytes().await {
                Ok(data) => data,
                Err(error) => return Outcome::Failed(error.into()),
            };
            let Some(key) = self.shared_key_bytes() else {
                return Outcome::AuthPending;
            };
            let plaintext = match payload::decrypt(&data, &expected_hash, &key) {
                Ok(plaintext) => plaintext,
                Err(error) => return Outcome::Failed(error.into()),
            };
            match serde_json::from_slice(&plaintext) {
                Ok(value) => Outcome::Ok(value),
                Err(error) => Outcome::Failed(error.into()),
            }
        } else {
            let bytes = match response.bytes().await {
                Ok(bytes) => bytes,
                Err(error) => return Outcome::Failed(error.into()),
            };
            let value: serde_json::Value = match serde_json::from_slice(&bytes) {
                Ok(value) => value,
                Err(_) => {
                    return Outcome::Failed(Error::Protocol("Expected encrypted payload".into()));
                }
            };
            let message_only = value
                .as_object()
                .map(|object| object.len() == 1 && object.contains_key("message"))
                .unwrap_or(false);
            if !message_only {
                return Outcome::Failed(Error::Protocol("Expected encrypted payload".into()));
            }
            match serde_json::from_value(value) {
                Ok(value) => Outcome::Ok(value),
                Err(error) => Outcome::Failed(error.into()),
            }
        }
    }

    /// React to a 401: drop the key material and re-handshake.
    async fn handle_unauthorized(&self) {
        log::warn!("request unauthorized; restarting key exchange");

        let (invalid_password, run_exchange) = {
            let mut state = self.state.lock();
            state.shared = None;
            let had_encryption_key = state.encryption_public_key.take().is_some();
            let run_exchange = !state.exchange_in_flight;
            if run_exchange {
                state.exchange_in_flight = true;
            }
            (
                had_encryption_key && !self.authenticated_once.load(Ordering::SeqCst),
                run_exchange,
            )
        };

        if invalid_password {
            self.sink.show_error("Invalid password");
        }
        if run_exchange {
            self.run_key_exchange().await;
        }
    }
}

/// Pull an application-level message out of an error response.
pub(super) async fn read_error_message(response: reqwest::Response) -> String {
    let status = response.status();
    if let Ok(value) = response.json::<serde_json::Value>().await {
        if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
            return message.to_string();
        }
    }
    status
        .canonical_reason()
        .unwrap_or("request failed")
        .to_string()
}
