// SPDX-License-Identifier: AGPL-3.0
// Remote Explorer Core - Server session management
//
// The session record is the only durable state. It is written on a
// successful connect and removed on disconnect. Older records may carry
// their timestamp as epoch seconds or as ISO-8601; both are read back.

use crate::client::{parse_server_url, RemoteFileClient};
use crate::settings::config_dir;
use crate::types::{AppError, ConnectionStatus, DateEncoding, ServerSession};
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Trim, drop one trailing `/`, and default the scheme to `http://`.
pub fn normalize_url(raw: &str) -> String {
    let mut normalized = raw.trim().to_string();

    if normalized.ends_with('/') {
        normalized.pop();
    }

    if !normalized.starts_with("http://") && !normalized.starts_with("https://") {
        normalized = format!("http://{}", normalized);
    }

    normalized
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EpochSecondsRecord {
    #[serde(rename = "serverUrl", alias = "serverURL")]
    server_url: String,
    #[serde(default)]
    server_name: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    is_connected: bool,
    #[serde(default, alias = "lastConnected", with = "chrono::serde::ts_seconds_option")]
    last_connected_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Iso8601Record {
    #[serde(rename = "serverUrl", alias = "serverURL")]
    server_url: String,
    #[serde(default)]
    server_name: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    is_connected: bool,
    #[serde(default, alias = "lastConnected")]
    last_connected_at: Option<DateTime<Utc>>,
}

macro_rules! record_conversions {
    ($record:ident) => {
        impl From<$record> for ServerSession {
            fn from(r: $record) -> Self {
                ServerSession {
                    server_url: r.server_url,
                    server_name: r.server_name,
                    version: r.version,
                    is_connected: r.is_connected,
                    last_connected_at: r.last_connected_at,
                }
            }
        }

        impl From<&ServerSession> for $record {
            fn from(s: &ServerSession) -> Self {
                $record {
                    server_url: s.server_url.clone(),
                    server_name: s.server_name.clone(),
                    version: s.version.clone(),
                    is_connected: s.is_connected,
                    last_connected_at: s.last_connected_at,
                }
            }
        }
    };
}

record_conversions!(EpochSecondsRecord);
record_conversions!(Iso8601Record);

type Decoder = fn(&str) -> Result<ServerSession, serde_json::Error>;

fn decode_epoch_seconds(content: &str) -> Result<ServerSession, serde_json::Error> {
    serde_json::from_str::<EpochSecondsRecord>(content).map(Into::into)
}

fn decode_iso8601(content: &str) -> Result<ServerSession, serde_json::Error> {
    serde_json::from_str::<Iso8601Record>(content).map(Into::into)
}

/// Tried in order; the first success wins.
const DECODERS: &[(DateEncoding, Decoder)] = &[
    (DateEncoding::EpochSeconds, decode_epoch_seconds),
    (DateEncoding::Iso8601, decode_iso8601),
];

/// Decode a session record with the first decoder that accepts it.
pub fn decode_session(content: &str) -> Option<ServerSession> {
    for (encoding, decoder) in DECODERS {
        match decoder(content) {
            Ok(session) => return Some(session),
            Err(e) => tracing::debug!("Session record is not {:?}: {}", encoding, e),
        }
    }
    None
}

pub fn encode_session(session: &ServerSession, encoding: DateEncoding) -> Result<String, AppError> {
    let result = match encoding {
        DateEncoding::EpochSeconds => {
            serde_json::to_string_pretty(&EpochSecondsRecord::from(session))
        }
        DateEncoding::Iso8601 => serde_json::to_string_pretty(&Iso8601Record::from(session)),
    };

    result.map_err(|e| AppError::Serialization(format!("Failed to serialize session: {}", e)))
}

/// File-backed storage for the single session record
pub struct SessionStore {
    file_path: PathBuf,
    encoding: DateEncoding,
}

impl SessionStore {
    /// Store in the platform config directory
    pub fn new(encoding: DateEncoding) -> Result<Self, AppError> {
        Ok(Self::with_path(config_dir()?.join("session.json"), encoding))
    }

    pub fn with_path(file_path: impl Into<PathBuf>, encoding: DateEncoding) -> Self {
        Self {
            file_path: file_path.into(),
            encoding,
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    pub fn save(&self, session: &ServerSession) -> Result<(), AppError> {
        let content = encode_session(session, self.encoding)?;

        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.file_path, content)
            .map_err(|e| AppError::FileIo(format!("Failed to write session: {}", e)))
    }

    /// Read the record back. A record no decoder accepts is deleted.
    pub fn load(&self) -> Option<ServerSession> {
        let content = match fs::read_to_string(&self.file_path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Failed to read session record: {}", e);
                return None;
            }
        };

        let session = decode_session(&content);
        if session.is_none() {
            tracing::warn!("Discarding corrupted session record {:?}", self.file_path);
            if let Err(e) = self.clear() {
                tracing::warn!("Failed to remove corrupted session record: {}", e);
            }
        }
        session
    }

    pub fn clear(&self) -> Result<(), AppError> {
        match fs::remove_file(&self.file_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::FileIo(format!("Failed to remove session: {}", e))),
        }
    }
}

/// Connection lifecycle: Disconnected -> Connecting -> Connected | Error.
/// Only `disconnect` goes back to Disconnected.
pub struct ServerSessionManager {
    client: Arc<dyn RemoteFileClient>,
    store: SessionStore,
    status: ConnectionStatus,
    current: Option<ServerSession>,
}

impl ServerSessionManager {
    pub fn new(client: Arc<dyn RemoteFileClient>, store: SessionStore) -> Self {
        Self {
            client,
            store,
            status: ConnectionStatus::Disconnected,
            current: None,
        }
    }

    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    pub fn current(&self) -> Option<&ServerSession> {
        self.current.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    /// Restore the persisted session, re-attaching the client if it was connected.
    pub fn load_saved_session(&mut self) -> Option<ServerSession> {
        let session = self.store.load()?;

        if session.is_connected {
            match parse_server_url(&session.server_url) {
                Ok(url) => {
                    tracing::info!("Restored session for {}", session.server_url);
                    self.client.set_base_url(Some(url));
                    self.status = ConnectionStatus::Connected;
                }
                Err(e) => {
                    tracing::warn!("Saved session has an unusable address: {}", e);
                    let _ = self.store.clear();
                    return None;
                }
            }
        }

        self.current = Some(session.clone());
        Some(session)
    }

    /// Enter `Connecting`. `connect` does this itself; callers that publish
    /// the transition call it first.
    pub fn begin_connect(&mut self) {
        self.status = ConnectionStatus::Connecting;
    }

    /// A failed attempt detaches the client from any previous server. The
    /// persisted record is only removed by `disconnect`.
    pub async fn connect(&mut self, raw_input: &str) -> Result<ServerSession, AppError> {
        self.begin_connect();

        match self.try_connect(raw_input).await {
            Ok(session) => {
                self.status = ConnectionStatus::Connected;
                self.current = Some(session.clone());
                Ok(session)
            }
            Err(e) => {
                tracing::warn!("Connection to {:?} failed: {}", raw_input, e);
                self.client.set_base_url(None);
                self.current = None;
                self.status = ConnectionStatus::Error(e.to_string());
                Err(e)
            }
        }
    }

    async fn try_connect(&self, raw_input: &str) -> Result<ServerSession, AppError> {
        let normalized = normalize_url(raw_input);
        let url = parse_server_url(&normalized)?;

        if !self.client.test_connection(&normalized).await? {
            return Err(AppError::InvalidInput(format!(
                "{} did not answer like a file server",
                normalized
            )));
        }

        let info = match self.client.fetch_server_info(&normalized).await {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!("Server info unavailable: {}", e);
                None
            }
        };
        let info = info.unwrap_or_default();

        let session = ServerSession {
            server_url: normalized,
            server_name: info.name,
            version: info.version,
            is_connected: true,
            last_connected_at: Some(Utc::now().trunc_subsecs(0)),
        };

        if let Err(e) = self.store.save(&session) {
            tracing::error!("Failed to persist session: {}", e);
        }
        self.client.set_base_url(Some(url));

        tracing::info!(
            "Connected to {} ({})",
            session.server_url,
            session.server_name.as_deref().unwrap_or("unnamed")
        );
        Ok(session)
    }

    /// Forget the server. In-memory state is cleared even if the record cannot be removed.
    pub fn disconnect(&mut self) -> Result<(), AppError> {
        self.client.set_base_url(None);
        self.current = None;
        self.status = ConnectionStatus::Disconnected;
        tracing::info!("Disconnected");
        self.store.clear()
    }
}
