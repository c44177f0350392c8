// SPDX-License-Identifier: AGPL-3.0
// Remote Explorer CLI - Interactive terminal frontend

mod shell;

use clap::Parser;
use remote_explorer_core::{
    AppError, ConnectionStatus, ExplorerBridge, ExplorerEvent, ExplorerSession, HttpFileClient,
    SessionStore, SettingsStore, TransferEvent,
};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

#[derive(Parser, Debug)]
#[command(
    name = "remote-explorer",
    version,
    about = "Browse and manage files on a remote file server"
)]
struct Args {
    /// Server address to connect to on startup (e.g. 192.168.1.20:5000)
    #[arg(short, long)]
    server: Option<String>,

    /// Settings file to use instead of the platform config directory
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Root directory for downloaded files (overrides the setting)
    #[arg(long, value_name = "DIR")]
    storage_root: Option<PathBuf>,

    /// Ignore the saved session
    #[arg(long)]
    fresh: bool,
}

/// Print notifications and transfer progress as they arrive.
async fn print_events(mut events: broadcast::Receiver<ExplorerEvent>) {
    loop {
        match events.recv().await {
            Ok(ExplorerEvent::Notification(notification)) => {
                println!(
                    "[{}] {}",
                    shell::notification_prefix(notification.kind),
                    notification.message
                );
            }
            Ok(ExplorerEvent::Transfer(TransferEvent::Progress(progress))) => {
                print!(
                    "\r  {} -> {} {:>3.0}%",
                    progress.file_name,
                    progress.location,
                    progress.fraction * 100.0
                );
                let _ = std::io::stdout().flush();
            }
            Ok(ExplorerEvent::Transfer(TransferEvent::Completed { .. })) => println!(),
            Ok(ExplorerEvent::Transfer(TransferEvent::Failed { file_name, detail })) => {
                println!("\n[error] {} failed: {}", file_name, detail);
            }
            Ok(ExplorerEvent::Connection(ConnectionStatus::Connecting)) => println!("  connecting..."),
            Ok(ExplorerEvent::Connection(_)) | Ok(ExplorerEvent::StateChanged) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!("Event printer skipped {} events", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn build_bridge(args: &Args) -> Result<ExplorerBridge, AppError> {
    let settings_store = match &args.settings {
        Some(path) => SettingsStore::with_path(path.clone())?,
        None => SettingsStore::new()?,
    };
    let settings = settings_store.get();
    tracing::debug!("Using settings from {:?}", settings_store.path());

    let storage_root = args
        .storage_root
        .clone()
        .unwrap_or_else(|| settings.storage_root.clone());
    tracing::info!("Storing downloads under {:?}", storage_root);

    let client = Arc::new(HttpFileClient::new(&settings)?);
    let store = SessionStore::new(settings.session_date_encoding)?;
    tracing::debug!("Session record at {:?}", store.path());
    let session = ExplorerSession::new(client, store, storage_root);

    Ok(ExplorerBridge::spawn(session))
}

async fn run(args: Args) -> Result<(), AppError> {
    let bridge = build_bridge(&args)?;
    tokio::spawn(print_events(bridge.subscribe()));

    if !args.fresh {
        if let Some(session) = bridge.load_saved_session().await? {
            println!("Restored session for {}", session.server_url);
        }
    }

    if let Some(server) = &args.server {
        if let Err(e) = shell::execute(&bridge, shell::ShellCommand::Connect(server.clone())).await
        {
            tracing::warn!("Startup connect failed: {}", e);
        }
    }

    println!("Type 'help' for commands.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        let _ = std::io::stdout().flush();

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let command = match shell::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(usage) => {
                println!("{}", usage);
                continue;
            }
        };

        match shell::execute(&bridge, command).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(AppError::SessionClosed) => return Err(AppError::SessionClosed),
            // Already shown as a notification
            Err(e) => tracing::debug!("Command failed: {}", e),
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("remote_explorer_cli=info".parse().unwrap())
                .add_directive("remote_explorer_core=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting Remote Explorer v{}", env!("CARGO_PKG_VERSION"));

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("remote-explorer: {}", e);
            ExitCode::FAILURE
        }
    }
}
