//! # Roomchat
//!
//! A minimal peer-to-peer group chat. Peers join a named room (an
//! iroh-gossip topic) and exchange `{"name", "text"}` JSON messages.
//!
//! ## Components
//!
//! - [`view_model::ChatViewModel`]: observable chat state for a renderer
//! - [`session::ChatSession`]: drives a [`roomchat_gossip::PeerNode`] and
//!   keeps the view-model in sync with its room
//! - [`message`]: the wire codec
//! - [`terminal`] and [`display`]: the terminal front end
//!
//! ## Example
//!
//! ```rust,ignore
//! use roomchat::{ChatConfig, ChatSession, ChatViewModel};
//! use roomchat_gossip::{IrohPeerNode, NodeConfig};
//!
//! let view = ChatViewModel::new("ada");
//! let node = IrohPeerNode::spawn(NodeConfig::default()).await;
//! let mut session = ChatSession::new(view.clone(), ChatConfig::default(), node);
//! session.start().await?;
//!
//! view.set_message_draft("hello room");
//! session.run(async {
//!     let _ = tokio::signal::ctrl_c().await;
//! }).await?;
//! ```

pub mod config;
pub mod demo;
pub mod display;
pub mod error;
pub mod message;
pub mod observable;
pub mod session;
pub mod terminal;
pub mod view_model;

pub use config::{ChatConfig, DEFAULT_ROOM};
pub use error::{ChatError, ChatResult};
pub use message::{ChatEntry, ChatMessage, CodecError, ANONYMOUS};
pub use observable::{Computed, ListenerId, Observable};
pub use session::{ChatSession, PublishOutcome, SessionPhase, SkipReason};
pub use view_model::{profile_url, ChatViewModel};
