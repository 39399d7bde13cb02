//! Shell command parsing and execution

use std::path::PathBuf;

use undertow_core::RegistryHandle;
use undertow_core::engine::{TorrentEntry, TorrentIdentifier};

const HELP: &str = "\
commands:
  add <path>          register a .torrent file and announce it
  remove <torrent>    unregister a torrent
  list                show registered torrents
  show <torrent>      details for one torrent
  start <torrent>     mark a torrent started
  stop <torrent>      mark a torrent stopped
  help                this text
  exit                leave the shell

<torrent> is a list number, a 40-digit info-hash or a name prefix.";

/// One line of shell input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Add(PathBuf),
    Remove(TorrentIdentifier),
    List,
    Show(TorrentIdentifier),
    Start(TorrentIdentifier),
    Stop(TorrentIdentifier),
    Help,
    Exit,
}

impl ShellCommand {
    /// Parses a line. Blank lines yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns a message for unknown commands or missing arguments.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (verb, argument) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        let needs_argument = |usage: &str| {
            if argument.is_empty() {
                Err(format!("usage: {usage}"))
            } else {
                Ok(argument)
            }
        };

        let command = match verb.to_lowercase().as_str() {
            "add" => ShellCommand::Add(PathBuf::from(needs_argument("add <path>")?)),
            "remove" | "rm" => {
                ShellCommand::Remove(needs_argument("remove <torrent>")?.into())
            }
            "list" | "ls" => ShellCommand::List,
            "show" => ShellCommand::Show(needs_argument("show <torrent>")?.into()),
            "start" => ShellCommand::Start(needs_argument("start <torrent>")?.into()),
            "stop" => ShellCommand::Stop(needs_argument("stop <torrent>")?.into()),
            "help" | "?" => ShellCommand::Help,
            "exit" | "quit" => ShellCommand::Exit,
            other => return Err(format!("unknown command '{other}', try 'help'")),
        };
        Ok(Some(command))
    }
}

/// Runs one command against the registry. Returns false on `exit`.
pub async fn execute(handle: &RegistryHandle, command: ShellCommand) -> bool {
    let result = match command {
        ShellCommand::Add(path) => handle.add_torrent_file(&path).await.map(|listing| {
            println!(
                "added {listing} ({}), {} peers",
                listing.info_hash, listing.peer_count
            );
        }),
        ShellCommand::Remove(identifier) => handle
            .remove(identifier)
            .await
            .map(|listing| println!("removed {}", listing.name)),
        ShellCommand::List => handle.list().await.map(|listings| {
            if listings.is_empty() {
                println!("no torrents registered");
            }
            for listing in listings {
                println!("{listing} [{}]", listing.state);
            }
        }),
        ShellCommand::Show(identifier) => handle.get(identifier).await.map(|entry| {
            print!("{}", describe(&entry));
        }),
        ShellCommand::Start(identifier) => handle
            .start(identifier)
            .await
            .map(|listing| println!("{listing} [{}]", listing.state)),
        ShellCommand::Stop(identifier) => handle
            .stop(identifier)
            .await
            .map(|listing| println!("{listing} [{}]", listing.state)),
        ShellCommand::Help => {
            println!("{HELP}");
            Ok(())
        }
        ShellCommand::Exit => return false,
    };

    if let Err(error) = result {
        tracing::debug!("Command failed: {:?}", error);
        println!("{}", error.user_message());
    }
    true
}

fn describe(entry: &TorrentEntry) -> String {
    let metainfo = &entry.metainfo;
    let info = &metainfo.info;
    let mut out = String::new();

    out.push_str(&format!("name:         {}\n", entry.name()));
    out.push_str(&format!("info-hash:    {}\n", entry.info_hash));
    out.push_str(&format!("state:        {}\n", entry.state));
    out.push_str(&format!("size:         {} bytes\n", info.total_length()));
    out.push_str(&format!(
        "pieces:       {} x {} bytes\n",
        info.piece_count(),
        info.piece_length()
    ));
    if let Some(comment) = &metainfo.comment {
        out.push_str(&format!("comment:      {comment}\n"));
    }
    if let Some(created_by) = &metainfo.created_by {
        out.push_str(&format!("created by:   {created_by}\n"));
    }
    if let Some(date) = metainfo.creation_date {
        out.push_str(&format!("created:      {}\n", date.to_rfc3339()));
    }

    let tracker = &entry.tracker;
    out.push_str(&format!(
        "tracker:      {} (interval {}s)\n",
        tracker.tracker_url, tracker.interval
    ));
    if let Some(warning) = &tracker.warning {
        out.push_str(&format!("warning:      {warning}\n"));
    }
    for failure in &tracker.failures {
        out.push_str(&format!("  skipped     {failure}\n"));
    }
    out.push_str(&format!("peers:        {}\n", entry.peers.len()));
    out.push_str(&format!("peer id:      {}\n", entry.peer_id));

    if info.is_multi_file() {
        out.push_str("files:\n");
        for file in info.files() {
            out.push_str(&format!("  {:>12}  {}\n", file.length, file.path));
        }
    }
    out
}
