//! Tagged call results.

use reqwest::StatusCode;

use crate::error::Error;

/// The result of one API call.
///
/// Callers pattern-match instead of probing nulls or catching exceptions;
/// "try again later" (`AuthPending`) is distinct from "this call failed".
#[derive(Debug)]
pub enum Outcome<T> {
    /// The call succeeded.
    Ok(T),
    /// The engine has no data for this request (HTTP 404).
    NotFound,
    /// The handshake has not completed and the caller asked not to wait.
    AuthPending,
    /// The signature was rejected (HTTP 401); a re-handshake was triggered.
    Unauthorized,
    /// The engine rejected the request with an application-level message.
    Rejected {
        /// The HTTP status the engine answered with.
        status: StatusCode,
        /// The engine's message, or the status reason when absent.
        message: String,
    },
    /// The call failed locally: transport, crypto, or protocol violation.
    Failed(Error),
}

impl<T> Outcome<T> {
    /// Whether the call succeeded.
    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok(_))
    }

    /// The success value, discarding failure detail.
    pub fn ok(self) -> Option<T> {
        match self {
            Outcome::Ok(value) => Some(value),
            _ => None,
        }
    }

    /// Map the success value, preserving every other variant.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Ok(value) => Outcome::Ok(f(value)),
            Outcome::NotFound => Outcome::NotFound,
            Outcome::AuthPending => Outcome::AuthPending,
            Outcome::Unauthorized => Outcome::Unauthorized,
            Outcome::Rejected { status, message } => Outcome::Rejected { status, message },
            Outcome::Failed(error) => Outcome::Failed(error),
        }
    }
}
