//! # Roomchat Gossip
//!
//! Named pub/sub rooms for roomchat, built on iroh-gossip.
//!
//! A room is an iroh-gossip topic whose id is the BLAKE3 hash of the room
//! name. Peers that open the same room name end up in the same swarm and
//! receive each other's broadcasts.
//!
//! ## Features
//!
//! - [`PeerNode`] / [`RoomChannel`] / [`RoomReceiver`] traits at the substrate seam
//! - [`IrohPeerNode`] running a real endpoint, gossip instance and router
//! - [`MemoryNetwork`] for tests and offline use, with fault injection
//! - Split sender/receiver handles for concurrent access
//!
//! ## Example
//!
//! ```rust,ignore
//! use roomchat_gossip::{IrohPeerNode, NodeConfig, PeerNode, RoomChannel, RoomReceiver};
//!
//! let node = IrohPeerNode::spawn(NodeConfig::default()).await?;
//! node.ready().await?;
//!
//! let split = node.open_room("test-room-1234").await?;
//! split.sender.broadcast(b"hello".to_vec().into()).await?;
//!
//! tokio::spawn(async move {
//!     let mut receiver = split.receiver;
//!     while let Some(result) = receiver.recv().await {
//!         match result {
//!             Ok(event) => println!("Received: {:?}", event),
//!             Err(e) => eprintln!("Error: {}", e),
//!         }
//!     }
//! });
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod identity;
pub mod memory;
pub mod node;
pub mod topic;
pub mod traits;

// Re-exports
pub use config::NodeConfig;
pub use error::{GossipError, GossipResult};
pub use events::{RoomEvent, RoomMessage};
pub use identity::PeerId;
pub use memory::{Fault, MemoryNetwork, MemoryNode, MemoryRoom, MemoryRoomReceiver};
pub use node::IrohPeerNode;
pub use topic::{IrohRoom, IrohRoomReceiver, RoomTopic};
pub use traits::{PeerNode, RoomChannel, RoomReceiver, SplitRoom};

// Re-export iroh-gossip ALPN for router registration
pub use iroh_gossip::net::GOSSIP_ALPN;
