//! Client for the Keelback backup engine's admin API.
//!
//! The engine exposes its configuration, activity and restore surfaces over
//! an authenticated, encrypted HTTP API. This crate implements the client
//! side of that protocol:
//!
//! - an x25519 key exchange with the engine, run once per session and
//!   re-run automatically when a request comes back unauthorized;
//! - an optional password-derived second keypair (Argon2i) proving password
//!   knowledge without ever transmitting the password;
//! - per-request signing with a strictly increasing nonce;
//! - transparent AES-256-CBC encryption of request and response bodies with
//!   a plaintext SHA-256 integrity tag;
//! - typed endpoint wrappers returning a tagged [`Outcome`] instead of
//!   nulls or exceptions.
//!
//! ## Quick start
//!
//! ```ignore
//! use keelback_client::{ApiClient, ClientConfig, Outcome};
//!
//! let client = ApiClient::new(ClientConfig::new(base_url))?;
//! client.connect().await?;
//!
//! if client.need_private_key_password(true).await? == Some(true) {
//!     client.submit_private_key_password(&password).await?;
//! }
//!
//! match client.configuration().await {
//!     Outcome::Ok(configuration) => render(configuration),
//!     Outcome::Unauthorized => prompt_for_password(),
//!     other => log::warn!("configuration unavailable: {other:?}"),
//! }
//! ```

pub mod api;
pub mod config;
pub mod crypto;
mod error;
pub mod notify;

pub use api::{ApiClient, CallOptions, Outcome};
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use notify::{LogMessageSink, MessageSink};
