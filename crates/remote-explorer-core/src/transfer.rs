// SPDX-License-Identifier: AGPL-3.0
// Remote Explorer Core - Downloads, uploads and mirrored storage
//
// Downloaded files land in a local tree that mirrors the remote layout:
// <storage_root>/FileManager/<server identity>/<relative dir>/<file name>
// Two servers deriving the same identity share a namespace.

use crate::client::RemoteFileClient;
use crate::types::{AppError, FileEntry, ServerSession, TransferEvent, TransferProgress};
use async_channel::Sender;
use reqwest::Url;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Top-level directory of the mirrored tree under the storage root
pub const MIRROR_DIR_NAME: &str = "FileManager";

const FALLBACK_IDENTITY: &str = "Server";

/// Namespace for a server's mirrored files: its reported name, else its host.
pub fn server_identity(session: Option<&ServerSession>) -> String {
    let Some(session) = session else {
        return FALLBACK_IDENTITY.to_string();
    };

    if let Some(name) = session.server_name.as_deref().map(str::trim) {
        if !name.is_empty() {
            return name.to_string();
        }
    }

    Url::parse(&session.server_url)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .filter(|host| !host.is_empty())
        .unwrap_or_else(|| FALLBACK_IDENTITY.to_string())
}

/// Path components that stay inside their parent directory
fn safe_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
}

/// Display form of a remote directory for progress notifications
pub fn display_location(relative_dir: &str) -> String {
    format!("/{}", relative_dir)
}

pub struct TransferEngine {
    client: Arc<dyn RemoteFileClient>,
    storage_root: PathBuf,
}

impl TransferEngine {
    pub fn new(client: Arc<dyn RemoteFileClient>, storage_root: impl Into<PathBuf>) -> Self {
        Self {
            client,
            storage_root: storage_root.into(),
        }
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    /// Local directory mirroring `relative_dir` for the given server identity
    pub fn mirror_dir(&self, identity: &str, relative_dir: &str) -> PathBuf {
        let mut dir = self.storage_root.join(MIRROR_DIR_NAME);
        let identity: Vec<&str> = safe_segments(identity).collect();
        if identity.is_empty() {
            dir.push(FALLBACK_IDENTITY);
        } else {
            dir.push(identity.join("_"));
        }
        for segment in safe_segments(relative_dir) {
            dir.push(segment);
        }
        dir
    }

    /// Download `entry` and store it under the mirror of `current_dir`.
    ///
    /// Progress, completion and failure are reported on `events`. A failed
    /// write may leave a partial file behind.
    pub async fn download_and_store(
        &self,
        entry: &FileEntry,
        current_dir: &str,
        identity: &str,
        events: &Sender<TransferEvent>,
    ) -> Result<PathBuf, AppError> {
        let file_name = entry.name.clone();
        let location = display_location(current_dir);

        let result = self
            .fetch_and_write(entry, current_dir, identity, &location, events)
            .await;

        let event = match &result {
            Ok(path) => {
                tracing::info!("Saved {} to {:?}", file_name, path);
                TransferEvent::Completed {
                    file_name,
                    path: path.clone(),
                }
            }
            Err(e) => {
                tracing::error!("Download of {} failed: {}", file_name, e);
                TransferEvent::Failed {
                    file_name,
                    detail: e.to_string(),
                }
            }
        };
        let _ = events.send(event).await;

        result
    }

    async fn fetch_and_write(
        &self,
        entry: &FileEntry,
        current_dir: &str,
        identity: &str,
        location: &str,
        events: &Sender<TransferEvent>,
    ) -> Result<PathBuf, AppError> {
        let file_name = safe_segments(&entry.name)
            .last()
            .ok_or_else(|| AppError::InvalidInput(format!("Invalid file name: {:?}", entry.name)))?
            .to_string();

        let progress = |fraction: f64| TransferProgress {
            file_name: entry.name.clone(),
            location: location.to_string(),
            fraction: fraction.clamp(0.0, 1.0),
        };

        let _ = events.send(TransferEvent::Progress(progress(0.0))).await;

        // Fractions are non-negative, so their bit patterns order like the values.
        let last_sent = AtomicU64::new(0f64.to_bits());
        let on_progress = |fraction: f64| {
            let update = progress(fraction);
            let bits = update.fraction.to_bits();
            if last_sent.fetch_max(bits, Ordering::SeqCst) < bits {
                let _ = events.try_send(TransferEvent::Progress(update));
            }
        };

        let bytes = self
            .client
            .download(&entry.relative_path, &on_progress)
            .await?;

        let dir = self.mirror_dir(identity, current_dir);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| AppError::FileIo(format!("Failed to create {:?}: {}", dir, e)))?;

        let path = dir.join(file_name);
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| AppError::FileIo(format!("Failed to write {:?}: {}", path, e)))?;

        Ok(path)
    }

    /// Upload a local file into `target_dir`. Returns the uploaded file name.
    pub async fn upload_file(&self, local_path: &Path, target_dir: &str) -> Result<String, AppError> {
        let file_name = local_path
            .file_name()
            .ok_or_else(|| AppError::FileIo("Invalid file path".to_string()))?
            .to_string_lossy()
            .to_string();

        let bytes = tokio::fs::read(local_path)
            .await
            .map_err(|e| AppError::FileIo(format!("Failed to read {:?}: {}", local_path, e)))?;

        tracing::info!(
            "Uploading {} ({} bytes) to '{}'",
            file_name,
            bytes.len(),
            target_dir
        );
        self.client.upload(bytes, &file_name, target_dir).await?;

        Ok(file_name)
    }

    /// Every directory reachable from root, depth-first.
    ///
    /// Subtrees that fail to list are skipped; the result may be partial.
    pub async fn load_all_directories(&self) -> Vec<FileEntry> {
        let mut found = Vec::new();
        let mut visited = HashSet::from([String::new()]);
        let mut pending: Vec<FileEntry> = Vec::new();

        match self.client.list_directory("").await {
            Ok(listing) => push_directories(&mut pending, listing.items),
            Err(e) => {
                tracing::warn!("Failed to list root: {}", e);
                return found;
            }
        }

        while let Some(dir) = pending.pop() {
            if !visited.insert(dir.relative_path.clone()) {
                continue;
            }

            match self.client.list_directory(&dir.relative_path).await {
                Ok(listing) => push_directories(&mut pending, listing.items),
                Err(e) => tracing::warn!("Skipping '{}': {}", dir.relative_path, e),
            }
            found.push(dir);
        }

        found
    }
}

/// Queue directories so they pop in listing order.
fn push_directories(pending: &mut Vec<FileEntry>, items: Vec<FileEntry>) {
    pending.extend(items.into_iter().filter(|e| e.is_directory).rev());
}
