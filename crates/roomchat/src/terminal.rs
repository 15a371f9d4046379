//! Terminal front end: renders view-model changes and turns stdin lines
//! into drafts and commands

use std::io::{self, BufRead};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::display::*;
use crate::view_model::ChatViewModel;

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputCommand {
    /// Plain text to send
    Send(String),
    /// `/name <name>`
    SetName(String),
    /// `/id`
    ShowId,
    /// `/peers`
    ShowPeers,
    /// `/help`
    Help,
    /// `/quit`
    Quit,
    /// Blank line
    Empty,
    /// A known command used wrongly, with its usage
    Usage(&'static str),
    /// An unrecognized slash command
    Unknown(String),
}

/// Parse a line typed by the user
///
/// Chat text is kept as typed, minus the line ending.
pub fn parse_input(line: &str) -> InputCommand {
    let raw = line.trim_end_matches(['\r', '\n']);
    let input = raw.trim();
    if input.is_empty() {
        return InputCommand::Empty;
    }
    if !input.starts_with('/') {
        return InputCommand::Send(raw.to_string());
    }

    let (cmd, arg) = match input.split_once(char::is_whitespace) {
        Some((cmd, arg)) => (cmd, arg.trim()),
        None => (input, ""),
    };

    match cmd.to_lowercase().as_str() {
        "/quit" | "/exit" | "/q" => InputCommand::Quit,
        "/help" | "/?" => InputCommand::Help,
        "/id" => InputCommand::ShowId,
        "/peers" => InputCommand::ShowPeers,
        "/name" if arg.is_empty() => InputCommand::Usage("/name <name>"),
        "/name" => InputCommand::SetName(arg.to_string()),
        _ => InputCommand::Unknown(cmd.to_string()),
    }
}

/// Apply a command to the view-model
///
/// Returns `false` when the user asked to quit.
pub fn apply_input(view: &ChatViewModel, room: &str, command: InputCommand) -> bool {
    match command {
        InputCommand::Send(text) => view.set_message_draft(text),
        InputCommand::SetName(name) => {
            print_success(&format!("You are now '{}'", name));
            view.set_name(name);
        }
        InputCommand::ShowId => match (view.peer_id.get(), view.profile_url()) {
            (Some(id), Some(url)) => print_identity(id.as_str(), &url),
            _ => print_warning("Not connected yet"),
        },
        InputCommand::ShowPeers => {
            let peers: Vec<String> = view.peers.get().iter().map(|p| p.to_string()).collect();
            print_room_info(room, &peers);
        }
        InputCommand::Help => print_interactive_help(),
        InputCommand::Quit => {
            print_info("Goodbye!");
            return false;
        }
        InputCommand::Empty => {}
        InputCommand::Usage(usage) => print_warning(&format!("Usage: {}", usage)),
        InputCommand::Unknown(cmd) => {
            print_warning(&format!("Unknown command {}, try /help", cmd));
        }
    }
    true
}

/// Register terminal output for every view-model field
pub fn bind(view: &ChatViewModel, room: &str) {
    // Entries are prepended, so the new ones are at the front
    let printed = Arc::new(AtomicUsize::new(view.message_count()));
    view.messages.on_change(move |log| {
        let seen = printed.swap(log.len(), Ordering::SeqCst);
        let fresh = log.len().saturating_sub(seen);
        for entry in log[..fresh].iter().rev() {
            print_entry(entry);
        }
    });

    let room = room.to_string();
    view.subscribed.on_change(move |subscribed| {
        if *subscribed {
            print_success(&format!("Joined room '{}', start typing to chat", room));
        } else {
            print_system_message(&format!("left room '{}'", room));
        }
    });

    view.error.on_change(|error| {
        if let Some(error) = error {
            print_error(error);
        }
    });

    view.profile_url_computed().on_change(|url| {
        if let Some(url) = url {
            print_info(&format!("Your profile: {}", url));
        }
    });

    view.peers.on_change(|peers| {
        print_system_message(&format!("{} peer(s) in room", peers.len()));
    });
}

/// Read stdin lines on a dedicated thread
///
/// The channel closes at end of input.
pub fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Apply input lines until the user quits or input ends
pub async fn drive_input(
    view: ChatViewModel,
    room: String,
    mut lines: mpsc::UnboundedReceiver<String>,
) {
    while let Some(line) = lines.recv().await {
        if !apply_input(&view, &room, parse_input(&line)) {
            return;
        }
    }
    debug!("End of input");
}
