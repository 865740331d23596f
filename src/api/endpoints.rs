//! Typed wrappers over the engine's endpoints.
//!
//! Each wrapper builds a path, serializes a typed body where one exists and
//! hands the rest to [`ApiClient::call`]. Failure modes come from the
//! generic layer; only the source selection adds meaning to a status (406).

use reqwest::{Method, StatusCode};

use super::client::{ApiClient, CallOptions};
use super::models::{
    ActivityStatus, Configuration, InfoMessage, RestoreEntry, RestoreRequest, Share,
    ShareRequest, SourceEntry, SourceSelection,
};
use super::outcome::Outcome;

impl ApiClient {
    /// Fetch the engine's configuration (sets, destinations, retention).
    pub async fn configuration(&self) -> Outcome<Configuration> {
        self.call(Method::GET, "configuration", None, CallOptions::default())
            .await
    }

    /// Replace the engine's configuration.
    pub async fn update_configuration(
        &self,
        configuration: &Configuration,
    ) -> Outcome<InfoMessage> {
        let body = match serde_json::to_value(configuration) {
            Ok(body) => body,
            Err(error) => return Outcome::Failed(error.into()),
        };
        self.call(
            Method::POST,
            "configuration",
            Some(body),
            CallOptions::default(),
        )
        .await
    }

    /// Poll live engine status.
    ///
    /// Polling must not block on the handshake, so this yields
    /// [`Outcome::AuthPending`] until the exchange completes, and never
    /// reports errors to the user.
    pub async fn activity(&self) -> Outcome<ActivityStatus> {
        self.call(
            Method::GET,
            "activity",
            None,
            CallOptions {
                wait: false,
                silent: true,
            },
        )
        .await
    }

    /// List entries of the source filesystem under `path`.
    pub async fn list_sources(&self, path: Option<&str>) -> Outcome<Vec<SourceEntry>> {
        let api = match path {
            Some(path) => format!("sources?path={}", urlencoding::encode(path)),
            None => "sources".to_string(),
        };
        self.call(Method::GET, &api, None, CallOptions::default())
            .await
    }

    /// Select a path as a backup source.
    ///
    /// The engine answers 406 when no destination is configured yet; that
    /// is a state for the caller to act on, not an error to display.
    pub async fn select_source(&self, path: &str) -> Outcome<SourceSelection> {
        let api = format!("sources/select?path={}", urlencoding::encode(path));
        let outcome: Outcome<InfoMessage> = self
            .call(
                Method::POST,
                &api,
                None,
                CallOptions {
                    wait: true,
                    silent: true,
                },
            )
            .await;

        match outcome {
            Outcome::Rejected { status, .. } if status == StatusCode::NOT_ACCEPTABLE => {
                Outcome::Ok(SourceSelection::NeedsDestination)
            }
            Outcome::Rejected { status, message } => {
                self.report_error(&message);
                Outcome::Rejected { status, message }
            }
            other => other.map(|_| SourceSelection::Accepted),
        }
    }

    /// List configured shares.
    pub async fn shares(&self) -> Outcome<Vec<Share>> {
        self.call(Method::GET, "shares", None, CallOptions::default())
            .await
    }

    /// Create a share.
    pub async fn create_share(&self, share: &ShareRequest) -> Outcome<Share> {
        let body = match serde_json::to_value(share) {
            Ok(body) => body,
            Err(error) => return Outcome::Failed(error.into()),
        };
        self.call(Method::POST, "shares", Some(body), CallOptions::default())
            .await
    }

    /// Delete a share.
    pub async fn delete_share(&self, id: &str) -> Outcome<InfoMessage> {
        let api = format!("shares/{}", urlencoding::encode(id));
        self.call(Method::DELETE, &api, None, CallOptions::default())
            .await
    }

    /// Browse a snapshot in the restore browser.
    pub async fn browse_restore(
        &self,
        set: &str,
        snapshot: &str,
        path: Option<&str>,
    ) -> Outcome<Vec<RestoreEntry>> {
        let mut api = format!(
            "restore/{}/{}",
            urlencoding::encode(set),
            urlencoding::encode(snapshot)
        );
        if let Some(path) = path {
            api.push_str(&format!("?path={}", urlencoding::encode(path)));
        }
        self.call(Method::GET, &api, None, CallOptions::default())
            .await
    }

    /// Start a restore.
    pub async fn start_restore(&self, restore: &RestoreRequest) -> Outcome<InfoMessage> {
        let body = match serde_json::to_value(restore) {
            Ok(body) => body,
            Err(error) => return Outcome::Failed(error.into()),
        };
        self.call(Method::POST, "restore", Some(body), CallOptions::default())
            .await
    }
}
