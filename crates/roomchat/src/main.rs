//! Roomchat - P2P group chat
//!
//! ## Usage
//!
//! ```bash
//! # Join the default room on the iroh network
//! roomchat --name Alice
//!
//! # Join a named room through a known peer
//! roomchat --room lobby --peer <endpoint-id>
//!
//! # Chat with a simulated peer, no network needed
//! roomchat --offline
//! ```

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use roomchat::display::*;
use roomchat::{demo, terminal, ChatConfig, ChatSession, ChatViewModel, DEFAULT_ROOM};
use roomchat_gossip::{GossipResult, IrohPeerNode, MemoryNetwork, NodeConfig, PeerNode};
use roomchat_logging::{ChatSubscriberBuilder, LogConfig};

/// Roomchat - P2P group chat over gossip rooms
#[derive(Parser, Debug)]
#[command(name = "roomchat")]
#[command(about = "Minimal peer-to-peer group chat")]
#[command(version)]
struct Cli {
    /// Room to join
    #[arg(short, long, env = "ROOMCHAT_ROOM", default_value = DEFAULT_ROOM)]
    room: String,

    /// Your display name
    #[arg(short, long, env = "ROOMCHAT_NAME", default_value = "")]
    name: String,

    /// Endpoint id of a peer to join the room through (repeatable)
    #[arg(short, long = "peer", env = "ROOMCHAT_PEERS", value_delimiter = ',')]
    peers: Vec<String>,

    /// Use the in-memory network with a simulated peer
    #[arg(long)]
    offline: bool,

    /// Default log level (RUST_LOG takes precedence)
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Log JSONL to stderr instead of pretty output
    #[arg(long)]
    log_json: bool,

    /// Also write JSONL logs to this directory
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn log_config(&self) -> LogConfig {
        let mut config = if self.log_json {
            LogConfig::default()
        } else {
            LogConfig::interactive()
        };
        config.default_level = self.log_level.clone();
        if let Some(dir) = &self.log_file {
            config = config.with_file(dir);
        }
        config
    }

    fn chat_config(&self) -> ChatConfig {
        ChatConfig::default()
            .with_room(&self.room)
            .with_name(&self.name)
    }

    fn node_config(&self) -> NodeConfig {
        NodeConfig::default()
            .with_pubsub(true)
            .with_bootstrap(self.peers.iter().cloned())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = ChatSubscriberBuilder::new()
        .with_config(cli.log_config())
        .init()
        .context("Failed to initialize logging")?;

    let config = cli.chat_config();
    let view = ChatViewModel::new(config.name.clone());

    print_banner();
    if cli.offline {
        print_offline_mode();
    }
    terminal::bind(&view, &config.room);
    print_info(&format!("Connecting to room '{}'...", config.room.cyan()));

    let lines = terminal::spawn_stdin_reader();
    let input = tokio::spawn(terminal::drive_input(
        view.clone(),
        config.room.clone(),
        lines,
    ));
    let shutdown = async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = input => {}
        }
    };

    if cli.offline {
        let network = MemoryNetwork::new();
        let demo_peer = demo::spawn_demo_peer(&network, &config.room, Duration::from_millis(400))
            .await
            .context("Failed to start the simulated peer")?;
        let node = network.spawn_node(cli.node_config());
        run_session(view, config, node, shutdown).await?;
        demo_peer.abort();
    } else {
        let node = IrohPeerNode::spawn(cli.node_config()).await;
        run_session(view, config, node, shutdown).await?;
    }

    Ok(())
}

async fn run_session<N: PeerNode>(
    view: ChatViewModel,
    config: ChatConfig,
    node: GossipResult<N>,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    let mut session = ChatSession::new(view, config, node);
    print_interactive_help();

    session.run_until(shutdown).await?;
    Ok(())
}
