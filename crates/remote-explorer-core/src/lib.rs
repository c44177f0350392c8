// SPDX-License-Identifier: AGPL-3.0
// Remote Explorer Core - Shared logic for all frontends
//
// This crate provides:
// - RemoteFileClient and its HTTP implementation
// - PathNavigator, ClipboardController and TransferEngine
// - ServerSessionManager with the persisted session record
// - ExplorerSession and the ExplorerBridge actor that runs it
// - ClientSettings persisted by SettingsStore
//
// Frontend-specific code lives in separate crates.

pub mod bridge;
pub mod client;
pub mod clipboard;
pub mod explorer;
pub mod navigator;
pub mod session;
pub mod settings;
pub mod transfer;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export commonly used items
pub use bridge::{ExplorerBridge, ExplorerCommand};
pub use client::{HttpFileClient, RemoteFileClient};
pub use clipboard::ClipboardController;
pub use explorer::{ExplorerEvent, ExplorerSession, ExplorerSnapshot};
pub use navigator::PathNavigator;
pub use session::{ServerSessionManager, SessionStore};
pub use settings::SettingsStore;
pub use transfer::TransferEngine;
pub use types::{
    AppError, Breadcrumb, ClientError, ClientSettings, ClipboardEntry, ClipboardOperation,
    ConnectionStatus, DateEncoding, DirectoryListing, FileEntry, FileInfo, Notification,
    NotificationKind, ServerInfo, ServerSession, TransferEvent, TransferProgress,
};
