//! Substrate abstraction for rooms
//!
//! The chat layer talks to the network only through these traits, so the
//! same session code runs over real iroh networking ([`crate::IrohPeerNode`])
//! and over the in-memory network used by tests ([`crate::MemoryNode`]).

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::GossipResult;
use crate::events::RoomEvent;
use crate::identity::PeerId;

/// A network participant that can join rooms
///
/// # Example
///
/// ```rust,ignore
/// use roomchat_gossip::{PeerNode, RoomChannel, RoomReceiver};
///
/// async fn hello<N: PeerNode>(node: &N) -> GossipResult<()> {
///     node.ready().await?;
///     let split = node.open_room("lobby").await?;
///     split.sender.broadcast(b"hi".to_vec().into()).await
/// }
/// ```
#[async_trait]
pub trait PeerNode: Send + Sync {
    /// Sending half of an open room
    type Room: RoomChannel + 'static;
    /// Receiving half of an open room
    type Receiver: RoomReceiver + 'static;

    /// Wait until the node is connected and able to join rooms
    async fn ready(&self) -> GossipResult<()>;

    /// Our own identity
    async fn id(&self) -> GossipResult<PeerId>;

    /// Join the room with the given name
    ///
    /// The receiver yields [`RoomEvent::Subscribed`] first.
    async fn open_room(&self, name: &str) -> GossipResult<SplitRoom<Self::Room, Self::Receiver>>;

    /// Stop the node and close its connections
    async fn shutdown(&self) -> GossipResult<()> {
        Ok(())
    }
}

/// Sending half of a joined room
#[async_trait]
pub trait RoomChannel: Send + Sync {
    /// Room name as passed to [`PeerNode::open_room`]
    fn name(&self) -> &str;

    /// Send an opaque payload to every current subscriber
    ///
    /// Delivery is best-effort. Our own broadcasts are not delivered back
    /// to us.
    async fn broadcast(&self, data: Bytes) -> GossipResult<()>;

    /// Depart from the room
    ///
    /// Later broadcasts fail with [`crate::GossipError::NotSubscribed`].
    async fn leave(&self) -> GossipResult<()>;

    /// Peers currently known as neighbors in this room, sorted
    fn peers(&self) -> Vec<PeerId>;
}

/// Receiving half of a joined room
#[async_trait]
pub trait RoomReceiver: Send {
    /// Receive the next event from the room
    ///
    /// Returns `None` when the room is closed.
    async fn recv(&mut self) -> Option<GossipResult<RoomEvent>>;
}

/// A joined room with separate sender and receiver
pub struct SplitRoom<R, E> {
    /// Handle for sending messages
    pub sender: R,
    /// Receiver for incoming events
    pub receiver: E,
}
