// SPDX-License-Identifier: AGPL-3.0
// Remote Explorer Core - Explorer session
//
// Composes navigation, clipboard, transfers and the server session into the
// façade a frontend drives. All state lives here and is only mutated through
// `&mut self`; `ExplorerBridge` runs it on a single task.

use crate::client::RemoteFileClient;
use crate::clipboard::ClipboardController;
use crate::navigator::PathNavigator;
use crate::session::{ServerSessionManager, SessionStore};
use crate::transfer::{server_identity, TransferEngine};
use crate::types::{
    AppError, Breadcrumb, ClipboardEntry, ConnectionStatus, FileEntry, FileInfo, Notification,
    ServerSession, TransferEvent, TransferProgress,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Events published to the presentation layer
#[derive(Debug, Clone)]
pub enum ExplorerEvent {
    /// Published state changed; take a new snapshot
    StateChanged,
    /// Connection status moved; sent as it happens, including `Connecting`
    Connection(ConnectionStatus),
    Notification(Notification),
    Transfer(TransferEvent),
}

/// Everything a frontend renders, copied out of the session
#[derive(Debug, Clone)]
pub struct ExplorerSnapshot {
    pub current_path: String,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub files: Vec<FileEntry>,
    pub clipboard: Option<ClipboardEntry>,
    pub connection: ConnectionStatus,
    pub session: Option<ServerSession>,
    pub is_loading: bool,
    pub error_message: Option<String>,
    pub active_transfer: Option<TransferProgress>,
    /// Local root of the mirrored download tree
    pub storage_root: PathBuf,
}

fn validate_name(name: &str) -> Result<&str, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidInput("Name cannot be empty".to_string()));
    }
    if name.contains('/') {
        return Err(AppError::InvalidInput(format!(
            "Name cannot contain '/': {}",
            name
        )));
    }
    Ok(name)
}

fn display_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Record a transfer event in session state and publish it.
fn apply_transfer_event(
    active_transfer: &mut Option<TransferProgress>,
    events: &broadcast::Sender<ExplorerEvent>,
    event: TransferEvent,
) {
    match &event {
        TransferEvent::Progress(progress) => *active_transfer = Some(progress.clone()),
        TransferEvent::Completed { .. } | TransferEvent::Failed { .. } => *active_transfer = None,
    }
    let _ = events.send(ExplorerEvent::Transfer(event));
}

pub struct ExplorerSession {
    client: Arc<dyn RemoteFileClient>,
    navigator: PathNavigator,
    clipboard: ClipboardController,
    transfers: TransferEngine,
    sessions: ServerSessionManager,
    files: Vec<FileEntry>,
    is_loading: bool,
    error_message: Option<String>,
    active_transfer: Option<TransferProgress>,
    events: broadcast::Sender<ExplorerEvent>,
}

impl ExplorerSession {
    pub fn new(
        client: Arc<dyn RemoteFileClient>,
        store: SessionStore,
        storage_root: impl Into<PathBuf>,
    ) -> Self {
        let (events, _) = broadcast::channel(256);

        Self {
            navigator: PathNavigator::new(),
            clipboard: ClipboardController::new(),
            transfers: TransferEngine::new(client.clone(), storage_root),
            sessions: ServerSessionManager::new(client.clone(), store),
            client,
            files: Vec::new(),
            is_loading: false,
            error_message: None,
            active_transfer: None,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExplorerEvent> {
        self.events.subscribe()
    }

    pub(crate) fn event_sender(&self) -> broadcast::Sender<ExplorerEvent> {
        self.events.clone()
    }

    pub fn snapshot(&self) -> ExplorerSnapshot {
        ExplorerSnapshot {
            current_path: self.navigator.current_path().to_string(),
            breadcrumbs: self.navigator.breadcrumbs().to_vec(),
            files: self.files.clone(),
            clipboard: self.clipboard.entry().cloned(),
            connection: self.sessions.status().clone(),
            session: self.sessions.current().cloned(),
            is_loading: self.is_loading,
            error_message: self.error_message.clone(),
            active_transfer: self.active_transfer.clone(),
            storage_root: self.transfers.storage_root().to_path_buf(),
        }
    }

    pub fn current_path(&self) -> &str {
        self.navigator.current_path()
    }

    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    pub fn clipboard(&self) -> Option<&ClipboardEntry> {
        self.clipboard.entry()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error_message = None;
        self.changed();
    }

    fn changed(&self) {
        let _ = self.events.send(ExplorerEvent::StateChanged);
    }

    fn publish_connection(&self) {
        let status = self.sessions.status().clone();
        let _ = self.events.send(ExplorerEvent::Connection(status));
        self.changed();
    }

    fn notify(&self, notification: Notification) {
        let _ = self.events.send(ExplorerEvent::Notification(notification));
    }

    /// Surface `err` as the latest error and as a notification, then hand it back.
    fn fail(&mut self, err: AppError) -> AppError {
        self.error_message = Some(err.to_string());
        self.notify(Notification::new(err.to_string(), err.notification_kind()));
        self.changed();
        err
    }

    fn succeed(&mut self, message: String) {
        self.error_message = None;
        self.notify(Notification::success(message));
        self.changed();
    }

    fn ensure_connected(&mut self) -> Result<(), AppError> {
        if self.sessions.is_connected() {
            Ok(())
        } else {
            Err(self.fail(AppError::NotConnected))
        }
    }

    /// Forget everything tied to the previous server.
    fn reset_view(&mut self) {
        self.navigator.reset();
        self.clipboard.clear();
        self.files.clear();
        self.active_transfer = None;
    }

    // ---- Server session ----

    pub fn load_saved_session(&mut self) -> Option<ServerSession> {
        let session = self.sessions.load_saved_session();
        self.publish_connection();
        session
    }

    /// Whatever happens, nothing from the previous server survives.
    pub async fn connect(&mut self, address: &str) -> Result<ServerSession, AppError> {
        self.sessions.begin_connect();
        self.publish_connection();

        let result = self.sessions.connect(address).await;
        self.reset_view();
        self.publish_connection();

        match result {
            Ok(session) => {
                let name = session
                    .server_name
                    .clone()
                    .unwrap_or_else(|| session.server_url.clone());
                self.succeed(format!("Connected to {}", name));
                self.reload().await;
                Ok(session)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    pub fn disconnect(&mut self) -> Result<(), AppError> {
        let result = self.sessions.disconnect();
        self.reset_view();
        self.publish_connection();
        match result {
            Ok(()) => {
                self.succeed("Disconnected".to_string());
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Check the configured server again
    pub async fn check_connection(&mut self) -> Result<bool, AppError> {
        self.ensure_connected()?;
        match self.client.check_connection().await {
            Ok(alive) => {
                if !alive {
                    self.notify(Notification::warning("Server is not responding"));
                }
                Ok(alive)
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    // ---- Navigation ----

    async fn list(&mut self, path: &str) -> Result<(), AppError> {
        self.ensure_connected()?;
        self.is_loading = true;
        self.changed();

        let result = self.client.list_directory(path).await;
        self.is_loading = false;

        match result {
            Ok(listing) => {
                self.files = self.navigator.apply_listing(path, listing);
                self.error_message = None;
                self.changed();
                Ok(())
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    /// Re-list the current directory after a mutation; failures are surfaced, not returned.
    async fn reload(&mut self) {
        let path = self.navigator.current_path().to_string();
        if let Err(e) = self.list(&path).await {
            tracing::warn!("Failed to reload '{}': {}", path, e);
        }
    }

    pub async fn refresh(&mut self) -> Result<(), AppError> {
        let path = self.navigator.current_path().to_string();
        self.list(&path).await
    }

    /// Jump to any directory, e.g. a breadcrumb
    pub async fn navigate_to(&mut self, path: &str) -> Result<(), AppError> {
        self.list(path).await
    }

    pub async fn enter(&mut self, entry: &FileEntry) -> Result<(), AppError> {
        match self.navigator.enter_target(entry) {
            Some(path) => self.list(&path).await,
            None => Err(self.fail(AppError::InvalidInput(format!(
                "{} is not a folder",
                entry.name
            )))),
        }
    }

    pub async fn go_up(&mut self) -> Result<(), AppError> {
        let path = self.navigator.up_target();
        self.list(&path).await
    }

    pub async fn fetch_info(&mut self, path: &str) -> Result<FileInfo, AppError> {
        self.ensure_connected()?;
        match self.client.fetch_info(path).await {
            Ok(info) => Ok(info),
            Err(e) => Err(self.fail(e.into())),
        }
    }

    // ---- Clipboard ----

    pub async fn copy(&mut self, path: &str) -> Result<(), AppError> {
        self.ensure_connected()?;
        match self.clipboard.copy(self.client.as_ref(), path).await {
            Ok(()) => {
                self.succeed(format!("Copied {}", display_name(path)));
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    pub async fn cut(&mut self, path: &str) -> Result<(), AppError> {
        self.ensure_connected()?;
        match self.clipboard.cut(self.client.as_ref(), path).await {
            Ok(()) => {
                self.succeed(format!("Cut {}", display_name(path)));
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Paste into the current directory. The clipboard is empty afterwards either way.
    pub async fn paste(&mut self) -> Result<(), AppError> {
        if !self.sessions.is_connected() {
            self.clipboard.clear();
            return Err(self.fail(AppError::NotConnected));
        }
        let target = self.navigator.current_path().to_string();
        let result = self.clipboard.paste(self.client.as_ref(), &target).await;
        self.changed();

        match result {
            Ok(entry) => {
                self.succeed(format!("Pasted {}", display_name(&entry.source_path)));
                self.reload().await;
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    // ---- File operations ----

    pub async fn move_entry(&mut self, path: &str, target_dir: &str) -> Result<(), AppError> {
        self.ensure_connected()?;
        match self.client.move_entry(path, target_dir).await {
            Ok(()) => {
                self.succeed(format!("Moved {}", display_name(path)));
                self.reload().await;
                Ok(())
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    /// Rename in place. Empty names never reach the server.
    pub async fn rename(&mut self, path: &str, new_name: &str) -> Result<(), AppError> {
        let new_name = validate_name(new_name).map_err(|e| self.fail(e))?;
        self.ensure_connected()?;

        match self.client.rename(path, new_name).await {
            Ok(()) => {
                self.succeed(format!("Renamed to {}", new_name));
                self.reload().await;
                Ok(())
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    pub async fn delete(&mut self, path: &str) -> Result<(), AppError> {
        self.ensure_connected()?;
        match self.client.delete(path).await {
            Ok(()) => {
                self.succeed(format!("Deleted {}", display_name(path)));
                self.reload().await;
                Ok(())
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    pub async fn create_file(&mut self, name: &str, content: &str) -> Result<(), AppError> {
        let name = validate_name(name).map_err(|e| self.fail(e))?;
        self.ensure_connected()?;

        let target = self.navigator.current_path().to_string();
        match self.client.create_file(name, content, &target).await {
            Ok(()) => {
                self.succeed(format!("Created {}", name));
                self.reload().await;
                Ok(())
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    pub async fn create_folder(&mut self, name: &str) -> Result<(), AppError> {
        let name = validate_name(name).map_err(|e| self.fail(e))?;
        self.ensure_connected()?;

        let target = self.navigator.current_path().to_string();
        match self.client.create_folder(name, &target).await {
            Ok(()) => {
                self.succeed(format!("Created folder {}", name));
                self.reload().await;
                Ok(())
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    // ---- Transfers ----

    /// Download `entry` into the mirror of the current directory.
    ///
    /// Progress arrives from the body stream over a channel and is applied
    /// here, between polls of the transfer, never from the stream itself.
    pub async fn download(&mut self, entry: &FileEntry) -> Result<PathBuf, AppError> {
        self.ensure_connected()?;
        if entry.is_directory {
            return Err(self.fail(AppError::InvalidInput(format!(
                "{} is a folder",
                entry.name
            ))));
        }

        let identity = server_identity(self.sessions.current());
        let current_dir = self.navigator.current_path().to_string();
        let (event_tx, event_rx) = async_channel::unbounded();

        let Self {
            transfers,
            active_transfer,
            events,
            ..
        } = self;

        let result = {
            let transfer = transfers.download_and_store(entry, &current_dir, &identity, &event_tx);
            tokio::pin!(transfer);

            loop {
                tokio::select! {
                    result = &mut transfer => break result,
                    Ok(event) = event_rx.recv() => {
                        apply_transfer_event(active_transfer, events, event);
                        let _ = events.send(ExplorerEvent::StateChanged);
                    }
                }
            }
        };

        while let Ok(event) = event_rx.try_recv() {
            apply_transfer_event(active_transfer, events, event);
        }
        *active_transfer = None;

        match result {
            Ok(path) => {
                self.succeed(format!("Saved {}", entry.name));
                Ok(path)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Upload a local file into the current directory, then re-list it.
    pub async fn upload(&mut self, local_path: &Path) -> Result<String, AppError> {
        self.ensure_connected()?;
        let target = self.navigator.current_path().to_string();

        match self.transfers.upload_file(local_path, &target).await {
            Ok(name) => {
                self.succeed(format!("Uploaded {}", name));
                self.reload().await;
                Ok(name)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// All remote directories, for destination pickers. May be partial.
    pub async fn load_all_directories(&mut self) -> Result<Vec<FileEntry>, AppError> {
        self.ensure_connected()?;
        Ok(self.transfers.load_all_directories().await)
    }
}
