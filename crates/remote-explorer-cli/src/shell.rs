// SPDX-License-Identifier: AGPL-3.0
// Remote Explorer CLI - Shell commands
//
// Parses one input line into a command and runs it against the bridge.
// Names refer to entries of the current listing; anything else is taken as
// a path relative to the server root.

use remote_explorer_core::{
    AppError, ExplorerBridge, ExplorerSnapshot, FileEntry, NotificationKind,
};
use std::path::PathBuf;

pub const HELP: &str = "\
Commands:
  ls                     list the current directory
  cd <name|/path|..>     enter a folder, jump to a path, or go up
  up                     go to the parent directory
  pwd                    show the current path and breadcrumbs
  info <name>            show file details
  get <name>             download into the local mirror
  put <local file>       upload into the current directory
  mkdir <name>           create a folder
  touch <name> [text]    create a file with optional content
  rename <name> <new>    rename an entry
  rm <name>              delete an entry
  copy <name>            mark an entry for copy
  cut <name>             mark an entry for move
  paste                  paste the marked entry here
  mv <name> <dir>        move an entry directly
  tree                   list every remote directory
  connect <address>      connect to a server
  disconnect             forget the server
  ping                   check that the server still answers
  status                 show connection and clipboard
  quit                   leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    List,
    ChangeDir(String),
    Up,
    Pwd,
    Info(String),
    Get(String),
    Put(PathBuf),
    MakeDir(String),
    Touch { name: String, content: String },
    Rename { name: String, new_name: String },
    Remove(String),
    Copy(String),
    Cut(String),
    Paste,
    Move { name: String, target_dir: String },
    Tree,
    Connect(String),
    Disconnect,
    Ping,
    Status,
    Help,
    Quit,
}

fn one_arg(command: &str, args: &[&str]) -> Result<String, String> {
    match args {
        [arg] => Ok(arg.to_string()),
        _ => Err(format!("usage: {} <name>", command)),
    }
}

/// Parse one line. Blank lines yield `Ok(None)`.
pub fn parse(line: &str) -> Result<Option<ShellCommand>, String> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let parsed = match command {
        "ls" => ShellCommand::List,
        "cd" => ShellCommand::ChangeDir(one_arg(command, &args)?),
        "up" => ShellCommand::Up,
        "pwd" => ShellCommand::Pwd,
        "info" => ShellCommand::Info(one_arg(command, &args)?),
        "get" => ShellCommand::Get(one_arg(command, &args)?),
        "put" => ShellCommand::Put(PathBuf::from(one_arg(command, &args)?)),
        "mkdir" => ShellCommand::MakeDir(one_arg(command, &args)?),
        "touch" => match args.split_first() {
            Some((name, rest)) => ShellCommand::Touch {
                name: name.to_string(),
                content: rest.join(" "),
            },
            None => return Err("usage: touch <name> [text]".to_string()),
        },
        "rename" => match args.as_slice() {
            [name, new_name] => ShellCommand::Rename {
                name: name.to_string(),
                new_name: new_name.to_string(),
            },
            _ => return Err("usage: rename <name> <new>".to_string()),
        },
        "rm" => ShellCommand::Remove(one_arg(command, &args)?),
        "copy" => ShellCommand::Copy(one_arg(command, &args)?),
        "cut" => ShellCommand::Cut(one_arg(command, &args)?),
        "paste" => ShellCommand::Paste,
        "mv" => match args.as_slice() {
            [name, target_dir] => ShellCommand::Move {
                name: name.to_string(),
                target_dir: target_dir.trim_matches('/').to_string(),
            },
            _ => return Err("usage: mv <name> <dir>".to_string()),
        },
        "tree" => ShellCommand::Tree,
        "connect" => ShellCommand::Connect(one_arg(command, &args)?),
        "disconnect" => ShellCommand::Disconnect,
        "ping" => ShellCommand::Ping,
        "status" => ShellCommand::Status,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" => ShellCommand::Quit,
        other => return Err(format!("unknown command '{}', try 'help'", other)),
    };

    Ok(Some(parsed))
}

/// Find `name` in the current listing, by display name or relative path.
pub fn find_entry<'a>(snapshot: &'a ExplorerSnapshot, name: &str) -> Option<&'a FileEntry> {
    snapshot
        .files
        .iter()
        .find(|entry| entry.name == name)
        .or_else(|| snapshot.files.iter().find(|entry| entry.relative_path == name))
}

/// Remote path for `name`: a listed entry's path, else a root-relative path.
pub fn resolve_path(snapshot: &ExplorerSnapshot, name: &str) -> String {
    match find_entry(snapshot, name) {
        Some(entry) => entry.relative_path.clone(),
        None => name.trim_matches('/').to_string(),
    }
}

fn print_listing(snapshot: &ExplorerSnapshot) {
    if snapshot.files.is_empty() {
        println!("  (empty)");
        return;
    }
    for entry in &snapshot.files {
        let marker = if entry.is_directory { "/" } else { "" };
        println!(
            "  {:<40} {:>10}  {}",
            format!("{}{}", entry.name, marker),
            entry.size_display,
            entry.modified_display
        );
    }
}

fn print_location(snapshot: &ExplorerSnapshot) {
    let crumbs: Vec<&str> = snapshot.breadcrumbs.iter().map(|c| c.name.as_str()).collect();
    println!("/{}  [{}]", snapshot.current_path, crumbs.join(" > "));
}

pub fn notification_prefix(kind: NotificationKind) -> &'static str {
    match kind {
        NotificationKind::Error => "error",
        NotificationKind::Warning => "warning",
        NotificationKind::Success => "ok",
    }
}

/// Run one command. Returns `false` when the shell should exit.
pub async fn execute(bridge: &ExplorerBridge, command: ShellCommand) -> Result<bool, AppError> {
    match command {
        ShellCommand::List => {
            bridge.refresh().await?;
            print_listing(&bridge.snapshot().await?);
        }
        ShellCommand::ChangeDir(target) => {
            if target == ".." {
                bridge.go_up().await?;
            } else if target.starts_with('/') {
                bridge.navigate_to(target.trim_matches('/')).await?;
            } else {
                let snapshot = bridge.snapshot().await?;
                match find_entry(&snapshot, &target) {
                    Some(entry) => bridge.enter(entry.clone()).await?,
                    None => {
                        println!("'{}' is not in this directory", target);
                        return Ok(true);
                    }
                }
            }
            print_location(&bridge.snapshot().await?);
        }
        ShellCommand::Up => {
            bridge.go_up().await?;
            print_location(&bridge.snapshot().await?);
        }
        ShellCommand::Pwd => print_location(&bridge.snapshot().await?),
        ShellCommand::Info(name) => {
            let path = resolve_path(&bridge.snapshot().await?, &name);
            let info = bridge.fetch_info(&path).await?;
            println!("  name:      {}", info.name);
            println!("  path:      {}", info.full_path);
            println!("  kind:      {}", if info.is_directory { "folder" } else { "file" });
            if let Some(size) = &info.size_formatted {
                println!("  size:      {}", size);
            }
            println!("  modified:  {}", info.modified);
            if let Some(mime) = &info.mime_type {
                println!("  type:      {}", mime);
            }
        }
        ShellCommand::Get(name) => {
            let snapshot = bridge.snapshot().await?;
            match find_entry(&snapshot, &name) {
                Some(entry) => {
                    let path = bridge.download(entry.clone()).await?;
                    println!("  saved to {}", path.display());
                }
                None => println!("'{}' is not in this directory", name),
            }
        }
        ShellCommand::Put(local) => {
            bridge.upload(local).await?;
        }
        ShellCommand::MakeDir(name) => bridge.create_folder(&name).await?,
        ShellCommand::Touch { name, content } => bridge.create_file(&name, &content).await?,
        ShellCommand::Rename { name, new_name } => {
            let path = resolve_path(&bridge.snapshot().await?, &name);
            bridge.rename(&path, &new_name).await?;
        }
        ShellCommand::Remove(name) => {
            let path = resolve_path(&bridge.snapshot().await?, &name);
            bridge.delete(&path).await?;
        }
        ShellCommand::Copy(name) => {
            let path = resolve_path(&bridge.snapshot().await?, &name);
            bridge.copy(&path).await?;
        }
        ShellCommand::Cut(name) => {
            let path = resolve_path(&bridge.snapshot().await?, &name);
            bridge.cut(&path).await?;
        }
        ShellCommand::Paste => bridge.paste().await?,
        ShellCommand::Move { name, target_dir } => {
            let path = resolve_path(&bridge.snapshot().await?, &name);
            bridge.move_entry(&path, &target_dir).await?;
        }
        ShellCommand::Tree => {
            for dir in bridge.load_all_directories().await? {
                println!("  /{}", dir.relative_path);
            }
        }
        ShellCommand::Connect(address) => {
            bridge.connect(&address).await?;
            print_listing(&bridge.snapshot().await?);
        }
        ShellCommand::Disconnect => bridge.disconnect().await?,
        ShellCommand::Ping => {
            let alive = bridge.check_connection().await?;
            println!("  server is {}", if alive { "up" } else { "not responding" });
        }
        ShellCommand::Status => {
            let snapshot = bridge.snapshot().await?;
            println!("  connection: {:?}", snapshot.connection);
            if let Some(session) = &snapshot.session {
                println!(
                    "  server:     {} ({})",
                    session.server_url,
                    session.server_name.as_deref().unwrap_or("unnamed")
                );
            }
            println!("  downloads:  {}", snapshot.storage_root.display());
            match &snapshot.clipboard {
                Some(entry) => println!(
                    "  clipboard:  {} ({})",
                    entry.source_path,
                    entry.operation.as_str()
                ),
                None => println!("  clipboard:  empty"),
            }
        }
        ShellCommand::Help => println!("{}", HELP),
        ShellCommand::Quit => return Ok(false),
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use remote_explorer_core::{Breadcrumb, ConnectionStatus};

    fn entry(name: &str, relative_path: &str, is_directory: bool) -> FileEntry {
        FileEntry {
            name: name.to_string(),
            relative_path: relative_path.to_string(),
            is_directory,
            size_display: "-".to_string(),
            modified_display: String::new(),
            is_image: false,
            is_video: false,
        }
    }

    fn snapshot() -> ExplorerSnapshot {
        ExplorerSnapshot {
            current_path: "docs".to_string(),
            breadcrumbs: vec![Breadcrumb::new("Home", ""), Breadcrumb::new("docs", "docs")],
            files: vec![
                entry("q1", "docs/q1", true),
                entry("plan.md", "docs/plan.md", false),
            ],
            clipboard: None,
            connection: ConnectionStatus::Connected,
            session: None,
            is_loading: false,
            error_message: None,
            active_transfer: None,
            storage_root: PathBuf::from("/tmp/mirror"),
        }
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse("   "), Ok(None));
        assert_eq!(parse("ls"), Ok(Some(ShellCommand::List)));
        assert_eq!(parse("exit"), Ok(Some(ShellCommand::Quit)));
        assert_eq!(
            parse("cd q1"),
            Ok(Some(ShellCommand::ChangeDir("q1".to_string())))
        );
    }

    #[test]
    fn test_parse_arguments() {
        assert_eq!(
            parse("touch todo.md buy milk"),
            Ok(Some(ShellCommand::Touch {
                name: "todo.md".to_string(),
                content: "buy milk".to_string(),
            }))
        );
        assert_eq!(
            parse("mv plan.md /archive/"),
            Ok(Some(ShellCommand::Move {
                name: "plan.md".to_string(),
                target_dir: "archive".to_string(),
            }))
        );
        assert!(parse("rename plan.md").is_err());
        assert!(parse("get").is_err());
        assert!(parse("frobnicate").is_err());
    }

    #[test]
    fn test_resolve_path() {
        let snapshot = snapshot();
        assert_eq!(resolve_path(&snapshot, "plan.md"), "docs/plan.md");
        assert_eq!(resolve_path(&snapshot, "docs/q1"), "docs/q1");
        assert_eq!(resolve_path(&snapshot, "/other/file.txt"), "other/file.txt");
        assert!(find_entry(&snapshot, "missing").is_none());
    }
}
