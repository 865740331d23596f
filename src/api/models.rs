//! Wire models for the engine's API.
//!
//! Field names follow the engine's camelCase JSON. Response models default
//! missing fields so partial payloads deserialize.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The engine's whole editable configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Configuration {
    /// Configured backup sets.
    pub sets: Vec<BackupSet>,
    /// Configured destinations.
    pub destinations: Vec<Destination>,
}

/// One backup set: what to back up, when, and how long to keep it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackupSet {
    /// Engine-assigned identifier; absent on creation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display name.
    pub name: String,
    /// Source paths included in the set.
    pub paths: Vec<String>,
    /// Cron-style schedule, if scheduled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    /// Retention policy, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention: Option<RetentionPolicy>,
}

/// How many snapshots of a set to keep.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetentionPolicy {
    /// Keep at least this many recent snapshots.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_last: Option<u32>,
    /// Keep snapshots younger than this many days.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_days: Option<u32>,
}

/// An upload destination.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Destination {
    /// Engine-assigned identifier; absent on creation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Destination type, e.g. `"s3"` or `"sftp"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Destination URL.
    pub url: String,
    /// Provider-specific options.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, String>,
}

/// Live engine status, polled while backups or restores run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActivityStatus {
    /// Engine state, e.g. `"idle"`, `"backup"`, `"restore"`, `"rebuild"`.
    pub state: String,
    /// Progress in the 0..=1 range, when the engine can estimate it.
    pub progress: Option<f64>,
    /// The file currently being processed.
    pub current_file: Option<String>,
    /// The set the activity belongs to.
    pub set_name: Option<String>,
}

/// An entry in the source filesystem listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceEntry {
    /// Absolute path of the entry.
    pub path: String,
    /// Whether the entry is a directory.
    pub dir: bool,
    /// Size in bytes for files.
    pub size: Option<u64>,
}

/// Result of selecting a backup source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSelection {
    /// The engine accepted the selection.
    Accepted,
    /// The engine requires a destination to be configured first.
    NeedsDestination,
}

/// A configured share.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Share {
    /// Engine-assigned identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// The shared path.
    pub path: String,
}

/// Request body for creating a share.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRequest {
    /// Display name.
    pub name: String,
    /// The path to share.
    pub path: String,
}

/// An entry in a snapshot listing, shown in the restore browser.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RestoreEntry {
    /// Path inside the snapshot.
    pub path: String,
    /// Whether the entry is a directory.
    pub dir: bool,
    /// Size in bytes for files.
    pub size: Option<u64>,
}

/// Request body for starting a restore.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreRequest {
    /// The set to restore from.
    pub set: String,
    /// The snapshot to restore from.
    pub snapshot: String,
    /// Paths to restore; empty restores everything.
    pub paths: Vec<String>,
    /// Target directory on the engine host.
    pub target: String,
    /// Whether existing files may be overwritten.
    pub overwrite: bool,
}

/// The informational `{message}` shape mutation endpoints answer with.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoMessage {
    /// The engine's message.
    pub message: String,
}
