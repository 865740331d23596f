//! The engine API client: handshake, signing, payload encryption and the
//! typed endpoint wrappers built on top.

mod auth;
mod client;
mod endpoints;
mod models;
mod outcome;

pub use client::{ApiClient, CallOptions};
pub use models::{
    ActivityStatus, BackupSet, Configuration, Destination, InfoMessage, RestoreEntry,
    RestoreRequest, RetentionPolicy, Share, ShareRequest, SourceEntry, SourceSelection,
};
pub use outcome::Outcome;

/// Header carrying the signing string: exchange public key, nonce and
/// digest(s).
pub const KEY_EXCHANGE_HEADER: &str = "x-keyexchange";

/// Header carrying the unpadded base64url SHA-256 of an encrypted body's
/// plaintext.
pub const PAYLOAD_HASH_HEADER: &str = "x-payload-hash";

/// Content type marking an encrypted JSON body.
pub const ENCRYPTED_CONTENT_TYPE: &str = "x-application/encrypted-json";
