// SPDX-License-Identifier: AGPL-3.0
// Remote Explorer Core - Type definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// A file or directory as returned by a directory listing.
///
/// Entries are immutable and replaced wholesale on every listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    /// Server-relative, `/`-separated, no leading slash. Empty = root.
    pub relative_path: String,
    #[serde(rename = "is_dir")]
    pub is_directory: bool,
    /// Pre-formatted size, "-" for directories
    #[serde(rename = "size")]
    pub size_display: String,
    #[serde(rename = "modified")]
    pub modified_display: String,
    #[serde(default)]
    pub is_image: bool,
    #[serde(default)]
    pub is_video: bool,
}

impl FileEntry {
    /// Stable identity: the relative path, or the name for root placeholders
    pub fn id(&self) -> &str {
        if self.relative_path.is_empty() {
            &self.name
        } else {
            &self.relative_path
        }
    }

    pub fn is_media(&self) -> bool {
        self.is_image || self.is_video
    }
}

/// A named waypoint between root and the current directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breadcrumb {
    pub name: String,
    pub path: String,
}

impl Breadcrumb {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    pub fn id(&self) -> &str {
        if !self.path.is_empty() {
            &self.path
        } else if !self.name.is_empty() {
            &self.name
        } else {
            "root"
        }
    }
}

/// Envelope of `GET /explorer/{path}?json=true`
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryListing {
    pub items: Vec<FileEntry>,
    #[serde(rename = "currentPath", alias = "current_path", default)]
    pub current_path: String,
    #[serde(default)]
    pub breadcrumbs: Vec<Breadcrumb>,
}

/// Detail record returned by `GET /file_info/{path}`. Fetched on demand, never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    pub full_path: String,
    pub relative_path: String,
    pub is_directory: bool,
    pub is_file: bool,
    #[serde(default)]
    pub size_formatted: Option<String>,
    #[serde(default)]
    pub size_bytes: Option<u64>,
    pub modified: String,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub accessed: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub extension: Option<String>,
    #[serde(default)]
    pub is_readable: Option<bool>,
    #[serde(default)]
    pub is_writable: Option<bool>,
    #[serde(default)]
    pub is_executable: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FileInfoEnvelope {
    #[serde(default)]
    pub success: bool,
    pub info: FileInfo,
}

/// Optional metadata published by `GET /api/info`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub features: Option<Vec<String>>,
}

/// The staged operation a paste will execute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardOperation {
    Copy,
    Cut,
}

impl ClipboardOperation {
    /// Wire value of the `operation` form field
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Copy => "copy",
            Self::Cut => "cut",
        }
    }
}

/// A source path whose mark call already succeeded server-side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardEntry {
    pub source_path: String,
    pub operation: ClipboardOperation,
}

/// The only durable state: the server the client is attached to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSession {
    pub server_url: String,
    pub server_name: Option<String>,
    pub version: Option<String>,
    pub is_connected: bool,
    pub last_connected_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error(String),
}

/// Progress of the download currently in flight
#[derive(Debug, Clone, PartialEq)]
pub struct TransferProgress {
    pub file_name: String,
    /// Display path of the remote directory
    pub location: String,
    /// Always within `[0, 1]`
    pub fraction: f64,
}

/// Events emitted by the transfer engine for the OS notification layer
#[derive(Debug, Clone, PartialEq)]
pub enum TransferEvent {
    Progress(TransferProgress),
    Completed { file_name: String, path: PathBuf },
    Failed { file_name: String, detail: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Error,
    Warning,
    Success,
}

impl NotificationKind {
    /// Errors and warnings need acknowledgement; successes are a passing banner.
    pub fn is_popup(&self) -> bool {
        matches!(self, Self::Error | Self::Warning)
    }
}

/// Ephemeral user-facing message
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: uuid::Uuid,
    pub message: String,
    pub kind: NotificationKind,
    pub duration: Duration,
}

impl Notification {
    pub fn new(message: impl Into<String>, kind: NotificationKind) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            message: message.into(),
            kind,
            duration: Duration::from_secs(3),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, NotificationKind::Error)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, NotificationKind::Warning)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(message, NotificationKind::Success)
    }
}

/// How `lastConnectedAt` is written to the session record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DateEncoding {
    #[default]
    EpochSeconds,
    Iso8601,
}

/// Client settings (frontend-agnostic)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSettings {
    /// Whole-request timeout for metadata calls
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Stall detection for transfers, which have no overall timeout
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
    /// Root of the mirrored download tree
    #[serde(default = "default_storage_root")]
    pub storage_root: PathBuf,
    #[serde(default)]
    pub session_date_encoding: DateEncoding,
    /// Minimum number of bytes between two progress events
    #[serde(default = "default_progress_step_bytes")]
    pub progress_step_bytes: u64,
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_read_timeout_secs() -> u64 {
    60
}

fn default_progress_step_bytes() -> u64 {
    32 * 1024
}

fn default_storage_root() -> PathBuf {
    crate::settings::project_dirs()
        .map(|d| d.data_local_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            read_timeout_secs: default_read_timeout_secs(),
            storage_root: default_storage_root(),
            session_date_encoding: DateEncoding::default(),
            progress_step_bytes: default_progress_step_bytes(),
        }
    }
}

/// Failures of a single remote call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error("Invalid server address: {0}")]
    InvalidAddress(String),

    #[error("Server unreachable: {0}")]
    Unreachable(String),

    #[error("{}", http_status_message(.code, .message))]
    HttpStatus { code: u16, message: Option<String> },

    #[error("Unexpected response from server: {reason}")]
    DecodeFailure { reason: String, raw: String },
}

fn http_status_message(code: &u16, message: &Option<String>) -> String {
    match message {
        Some(message) => format!("HTTP error {}: {}", code, message),
        None => format!("HTTP error: {}", code),
    }
}

/// Error types for the application
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("Nothing to paste")]
    NothingToPaste,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not connected to a server")]
    NotConnected,

    #[error("File I/O error: {0}")]
    FileIo(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Explorer session has shut down")]
    SessionClosed,
}

impl AppError {
    /// Guards the user can fix on the spot are warnings, everything else is an error.
    pub fn notification_kind(&self) -> NotificationKind {
        match self {
            AppError::NothingToPaste | AppError::InvalidInput(_) | AppError::NotConnected => {
                NotificationKind::Warning
            }
            _ => NotificationKind::Error,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::FileIo(err.to_string())
    }
}
