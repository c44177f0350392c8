// SPDX-License-Identifier: AGPL-3.0
// Remote Explorer Core - Explorer bridge
//
// Runs an ExplorerSession on a single tokio task. Frontends submit commands
// from any thread and read state back through snapshots and events.

use crate::explorer::{ExplorerEvent, ExplorerSession, ExplorerSnapshot};
use crate::types::{AppError, FileEntry, FileInfo, ServerSession};
use async_channel::{Receiver, Sender};
use std::path::PathBuf;
use tokio::sync::broadcast;

type Reply<T> = Sender<Result<T, AppError>>;

/// Commands processed by the session task, one at a time
#[derive(Debug)]
pub enum ExplorerCommand {
    Snapshot {
        reply: Sender<ExplorerSnapshot>,
    },
    LoadSavedSession {
        reply: Sender<Option<ServerSession>>,
    },
    Connect {
        address: String,
        reply: Reply<ServerSession>,
    },
    Disconnect {
        reply: Reply<()>,
    },
    CheckConnection {
        reply: Reply<bool>,
    },
    Refresh {
        reply: Reply<()>,
    },
    NavigateTo {
        path: String,
        reply: Reply<()>,
    },
    Enter {
        entry: FileEntry,
        reply: Reply<()>,
    },
    GoUp {
        reply: Reply<()>,
    },
    FetchInfo {
        path: String,
        reply: Reply<FileInfo>,
    },
    Copy {
        path: String,
        reply: Reply<()>,
    },
    Cut {
        path: String,
        reply: Reply<()>,
    },
    Paste {
        reply: Reply<()>,
    },
    Move {
        path: String,
        target_dir: String,
        reply: Reply<()>,
    },
    Rename {
        path: String,
        new_name: String,
        reply: Reply<()>,
    },
    Delete {
        path: String,
        reply: Reply<()>,
    },
    CreateFile {
        name: String,
        content: String,
        reply: Reply<()>,
    },
    CreateFolder {
        name: String,
        reply: Reply<()>,
    },
    Download {
        entry: FileEntry,
        reply: Reply<PathBuf>,
    },
    Upload {
        local_path: PathBuf,
        reply: Reply<String>,
    },
    LoadAllDirectories {
        reply: Reply<Vec<FileEntry>>,
    },
    ClearError,
}

/// Handle to a running explorer session. Cloning shares the same session.
#[derive(Clone)]
pub struct ExplorerBridge {
    command_tx: Sender<ExplorerCommand>,
    events: broadcast::Sender<ExplorerEvent>,
}

impl ExplorerBridge {
    /// Move `session` onto its own task. Must be called inside a tokio runtime.
    ///
    /// The task exits once every handle has been dropped.
    pub fn spawn(session: ExplorerSession) -> Self {
        let (command_tx, command_rx) = async_channel::bounded::<ExplorerCommand>(32);
        let events = session.event_sender();

        tokio::spawn(Self::run_session(session, command_rx));

        Self { command_tx, events }
    }

    async fn run_session(mut session: ExplorerSession, command_rx: Receiver<ExplorerCommand>) {
        while let Ok(command) = command_rx.recv().await {
            match command {
                ExplorerCommand::Snapshot { reply } => {
                    let _ = reply.send(session.snapshot()).await;
                }
                ExplorerCommand::LoadSavedSession { reply } => {
                    let _ = reply.send(session.load_saved_session()).await;
                }
                ExplorerCommand::Connect { address, reply } => {
                    let _ = reply.send(session.connect(&address).await).await;
                }
                ExplorerCommand::Disconnect { reply } => {
                    let _ = reply.send(session.disconnect()).await;
                }
                ExplorerCommand::CheckConnection { reply } => {
                    let _ = reply.send(session.check_connection().await).await;
                }
                ExplorerCommand::Refresh { reply } => {
                    let _ = reply.send(session.refresh().await).await;
                }
                ExplorerCommand::NavigateTo { path, reply } => {
                    let _ = reply.send(session.navigate_to(&path).await).await;
                }
                ExplorerCommand::Enter { entry, reply } => {
                    let _ = reply.send(session.enter(&entry).await).await;
                }
                ExplorerCommand::GoUp { reply } => {
                    let _ = reply.send(session.go_up().await).await;
                }
                ExplorerCommand::FetchInfo { path, reply } => {
                    let _ = reply.send(session.fetch_info(&path).await).await;
                }
                ExplorerCommand::Copy { path, reply } => {
                    let _ = reply.send(session.copy(&path).await).await;
                }
                ExplorerCommand::Cut { path, reply } => {
                    let _ = reply.send(session.cut(&path).await).await;
                }
                ExplorerCommand::Paste { reply } => {
                    let _ = reply.send(session.paste().await).await;
                }
                ExplorerCommand::Move {
                    path,
                    target_dir,
                    reply,
                } => {
                    let _ = reply.send(session.move_entry(&path, &target_dir).await).await;
                }
                ExplorerCommand::Rename {
                    path,
                    new_name,
                    reply,
                } => {
                    let _ = reply.send(session.rename(&path, &new_name).await).await;
                }
                ExplorerCommand::Delete { path, reply } => {
                    let _ = reply.send(session.delete(&path).await).await;
                }
                ExplorerCommand::CreateFile {
                    name,
                    content,
                    reply,
                } => {
                    let _ = reply.send(session.create_file(&name, &content).await).await;
                }
                ExplorerCommand::CreateFolder { name, reply } => {
                    let _ = reply.send(session.create_folder(&name).await).await;
                }
                ExplorerCommand::Download { entry, reply } => {
                    let _ = reply.send(session.download(&entry).await).await;
                }
                ExplorerCommand::Upload { local_path, reply } => {
                    let _ = reply.send(session.upload(&local_path).await).await;
                }
                ExplorerCommand::LoadAllDirectories { reply } => {
                    let _ = reply.send(session.load_all_directories().await).await;
                }
                ExplorerCommand::ClearError => session.clear_error(),
            }
        }

        tracing::info!("Explorer session stopped");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExplorerEvent> {
        self.events.subscribe()
    }

    /// Submit a command and wait for its reply.
    async fn request<T>(
        &self,
        build: impl FnOnce(Sender<T>) -> ExplorerCommand,
    ) -> Result<T, AppError> {
        let (reply_tx, reply_rx) = async_channel::bounded(1);
        self.command_tx
            .send(build(reply_tx))
            .await
            .map_err(|_| AppError::SessionClosed)?;
        reply_rx.recv().await.map_err(|_| AppError::SessionClosed)
    }

    pub async fn snapshot(&self) -> Result<ExplorerSnapshot, AppError> {
        self.request(|reply| ExplorerCommand::Snapshot { reply }).await
    }

    pub async fn load_saved_session(&self) -> Result<Option<ServerSession>, AppError> {
        self.request(|reply| ExplorerCommand::LoadSavedSession { reply })
            .await
    }

    pub async fn connect(&self, address: &str) -> Result<ServerSession, AppError> {
        let address = address.to_string();
        self.request(|reply| ExplorerCommand::Connect { address, reply })
            .await?
    }

    pub async fn disconnect(&self) -> Result<(), AppError> {
        self.request(|reply| ExplorerCommand::Disconnect { reply })
            .await?
    }

    pub async fn check_connection(&self) -> Result<bool, AppError> {
        self.request(|reply| ExplorerCommand::CheckConnection { reply })
            .await?
    }

    pub async fn refresh(&self) -> Result<(), AppError> {
        self.request(|reply| ExplorerCommand::Refresh { reply }).await?
    }

    pub async fn navigate_to(&self, path: &str) -> Result<(), AppError> {
        let path = path.to_string();
        self.request(|reply| ExplorerCommand::NavigateTo { path, reply })
            .await?
    }

    pub async fn enter(&self, entry: FileEntry) -> Result<(), AppError> {
        self.request(|reply| ExplorerCommand::Enter { entry, reply })
            .await?
    }

    pub async fn go_up(&self) -> Result<(), AppError> {
        self.request(|reply| ExplorerCommand::GoUp { reply }).await?
    }

    pub async fn fetch_info(&self, path: &str) -> Result<FileInfo, AppError> {
        let path = path.to_string();
        self.request(|reply| ExplorerCommand::FetchInfo { path, reply })
            .await?
    }

    pub async fn copy(&self, path: &str) -> Result<(), AppError> {
        let path = path.to_string();
        self.request(|reply| ExplorerCommand::Copy { path, reply })
            .await?
    }

    pub async fn cut(&self, path: &str) -> Result<(), AppError> {
        let path = path.to_string();
        self.request(|reply| ExplorerCommand::Cut { path, reply })
            .await?
    }

    pub async fn paste(&self) -> Result<(), AppError> {
        self.request(|reply| ExplorerCommand::Paste { reply }).await?
    }

    pub async fn move_entry(&self, path: &str, target_dir: &str) -> Result<(), AppError> {
        let path = path.to_string();
        let target_dir = target_dir.to_string();
        self.request(|reply| ExplorerCommand::Move {
            path,
            target_dir,
            reply,
        })
        .await?
    }

    pub async fn rename(&self, path: &str, new_name: &str) -> Result<(), AppError> {
        let path = path.to_string();
        let new_name = new_name.to_string();
        self.request(|reply| ExplorerCommand::Rename {
            path,
            new_name,
            reply,
        })
        .await?
    }

    pub async fn delete(&self, path: &str) -> Result<(), AppError> {
        let path = path.to_string();
        self.request(|reply| ExplorerCommand::Delete { path, reply })
            .await?
    }

    pub async fn create_file(&self, name: &str, content: &str) -> Result<(), AppError> {
        let name = name.to_string();
        let content = content.to_string();
        self.request(|reply| ExplorerCommand::CreateFile {
            name,
            content,
            reply,
        })
        .await?
    }

    pub async fn create_folder(&self, name: &str) -> Result<(), AppError> {
        let name = name.to_string();
        self.request(|reply| ExplorerCommand::CreateFolder { name, reply })
            .await?
    }

    pub async fn download(&self, entry: FileEntry) -> Result<PathBuf, AppError> {
        self.request(|reply| ExplorerCommand::Download { entry, reply })
            .await?
    }

    pub async fn upload(&self, local_path: impl Into<PathBuf>) -> Result<String, AppError> {
        let local_path = local_path.into();
        self.request(|reply| ExplorerCommand::Upload { local_path, reply })
            .await?
    }

    pub async fn load_all_directories(&self) -> Result<Vec<FileEntry>, AppError> {
        self.request(|reply| ExplorerCommand::LoadAllDirectories { reply })
            .await?
    }

    pub async fn clear_error(&self) -> Result<(), AppError> {
        self.command_tx
            .send(ExplorerCommand::ClearError)
            .await
            .map_err(|_| AppError::SessionClosed)
    }
}
