//! Terminal display utilities for the chat

use chrono::{DateTime, Local, Utc};
use colored::Colorize;

use crate::message::ChatEntry;

/// Print the application banner
pub fn print_banner() {
    println!();
    println!(
        "{}",
        "╔═══════════════════════════════════════════════════╗".cyan()
    );
    println!(
        "{}",
        "║        Roomchat - P2P Group Chat over Gossip      ║".cyan()
    );
    println!(
        "{}",
        "╚═══════════════════════════════════════════════════╝".cyan()
    );
    println!();
}

/// Print a success message
pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg.green());
}

/// Print an info message
pub fn print_info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg.dimmed());
}

/// Print an error message
pub fn print_error(msg: &str) {
    println!("{} {}", "✗".red().bold(), msg.red());
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg.yellow());
}

/// Print interactive mode help
pub fn print_interactive_help() {
    println!();
    println!("{}", "Commands:".yellow().bold());
    println!("  {}      - Send a message to the room", "<message>".cyan());
    println!("  {}   - Change your display name", "/name <name>".cyan());
    println!("  {}            - Show your peer id and profile link", "/id".cyan());
    println!("  {}         - Show peers in the room", "/peers".cyan());
    println!("  {}          - Show this help", "/help".cyan());
    println!("  {}          - Leave the room and exit", "/quit".cyan());
    println!();
}

/// Format the time column of a message
pub fn format_time(timestamp: DateTime<Utc>) -> String {
    let local_time: DateTime<Local> = timestamp.into();
    local_time.format("%H:%M").to_string()
}

/// Print a chat message
pub fn print_message(sender: &str, content: &str, timestamp: DateTime<Utc>, is_self: bool) {
    let time_str = format_time(timestamp);

    if is_self {
        println!(
            "{} {} {}",
            time_str.dimmed(),
            format!("{}:", sender).cyan().bold(),
            content
        );
    } else {
        println!(
            "{} {} {}",
            time_str.dimmed(),
            format!("{}:", sender).magenta().bold(),
            content
        );
    }
}

/// Print a log entry
pub fn print_entry(entry: &ChatEntry) {
    print_message(
        &entry.name,
        entry.text_or_empty(),
        entry.received_at,
        entry.local,
    );
}

/// Print a system message
pub fn print_system_message(msg: &str) {
    println!("{}", format!("    *** {} ***", msg).yellow().dimmed());
}

/// Print our identity
pub fn print_identity(peer_id: &str, profile_url: &str) {
    println!();
    println!("{}", "Identity:".yellow().bold());
    println!("{}", "───────────────────────────────────────".dimmed());
    println!("  {} {}", "Peer ID:".cyan(), peer_id);
    println!("  {} {}", "Profile:".cyan(), profile_url);
    println!();
}

/// Print room info
pub fn print_room_info(room: &str, peers: &[String]) {
    println!();
    println!("{}", "Room Information:".yellow().bold());
    println!("{}", "───────────────────────────────────────".dimmed());
    println!("  {} {}", "Room:".cyan(), room);
    if peers.is_empty() {
        println!("  {} {}", "Peers:".cyan(), "none yet".dimmed());
    } else {
        println!("  {}", "Peers:".cyan());
        for peer in peers {
            println!("    {} {}", "•".white(), peer);
        }
    }
    println!();
}

/// Print offline mode banner
pub fn print_offline_mode() {
    println!();
    println!(
        "{}",
        "════════════════════════════════════════════════════".yellow()
    );
    println!(
        "{}",
        "  Running OFFLINE - chatting with a simulated peer   ".yellow()
    );
    println!(
        "{}",
        "════════════════════════════════════════════════════".yellow()
    );
    println!();
}
