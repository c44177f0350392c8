// SPDX-License-Identifier: AGPL-3.0
// Remote Explorer Core - Clipboard mark/paste state machine
//
// Two states: empty, or marked with a source path and an operation. A mark
// is only recorded after the server accepted it. Paste empties the clipboard
// before the request goes out, so a failed paste requires marking again.

use crate::client::RemoteFileClient;
use crate::types::{AppError, ClipboardEntry, ClipboardOperation};

#[derive(Debug, Clone, Default)]
pub struct ClipboardController {
    entry: Option<ClipboardEntry>,
}

impl ClipboardController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&self) -> Option<&ClipboardEntry> {
        self.entry.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }

    pub async fn copy(&mut self, client: &dyn RemoteFileClient, path: &str) -> Result<(), AppError> {
        self.mark(client, path, ClipboardOperation::Copy).await
    }

    pub async fn cut(&mut self, client: &dyn RemoteFileClient, path: &str) -> Result<(), AppError> {
        self.mark(client, path, ClipboardOperation::Cut).await
    }

    async fn mark(
        &mut self,
        client: &dyn RemoteFileClient,
        path: &str,
        operation: ClipboardOperation,
    ) -> Result<(), AppError> {
        match operation {
            ClipboardOperation::Copy => client.mark_copy(path).await?,
            ClipboardOperation::Cut => client.mark_cut(path).await?,
        }

        // A previous mark is replaced without telling the server.
        self.entry = Some(ClipboardEntry {
            source_path: path.to_string(),
            operation,
        });
        tracing::info!("Marked {} for {}", path, operation.as_str());
        Ok(())
    }

    /// Execute the staged operation into `target_dir`. Returns the consumed entry.
    pub async fn paste(
        &mut self,
        client: &dyn RemoteFileClient,
        target_dir: &str,
    ) -> Result<ClipboardEntry, AppError> {
        let entry = self.entry.take().ok_or(AppError::NothingToPaste)?;

        tracing::info!(
            "Pasting {} into '{}' ({})",
            entry.source_path,
            target_dir,
            entry.operation.as_str()
        );
        client
            .paste(&entry.source_path, target_dir, entry.operation)
            .await?;

        Ok(entry)
    }

    pub fn clear(&mut self) {
        self.entry = None;
    }
}
