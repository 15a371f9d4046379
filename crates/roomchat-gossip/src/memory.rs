//! In-memory room network for testing and offline use
//!
//! Nodes spawned from the same [`MemoryNetwork`] share rooms by name and
//! deliver broadcasts through in-process channels. Faults can be injected
//! per operation to exercise error paths without a real network.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use roomchat_gossip::{MemoryNetwork, NodeConfig, PeerNode, RoomChannel};
//!
//! let network = MemoryNetwork::new();
//! let alice = network.spawn_node_with_id("alice", NodeConfig::default())?;
//! let bob = network.spawn_node_with_id("bob", NodeConfig::default())?;
//!
//! let a = alice.open_room("lobby").await?;
//! let mut b = bob.open_room("lobby").await?;
//! a.sender.broadcast(b"hello".to_vec().into()).await?;
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::{DashMap, DashSet};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::NodeConfig;
use crate::error::{GossipError, GossipResult};
use crate::events::{RoomEvent, RoomMessage};
use crate::identity::PeerId;
use crate::traits::{PeerNode, RoomChannel, RoomReceiver, SplitRoom};

/// Operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    /// [`MemoryNetwork::spawn_node`]
    Spawn,
    /// [`PeerNode::id`]
    Identity,
    /// [`PeerNode::open_room`]
    Open,
    /// [`RoomChannel::broadcast`]
    Broadcast,
    /// [`RoomChannel::leave`]
    Leave,
}

impl Fault {
    fn label(self) -> &'static str {
        match self {
            Fault::Spawn => "spawn",
            Fault::Identity => "identity",
            Fault::Open => "open",
            Fault::Broadcast => "broadcast",
            Fault::Leave => "leave",
        }
    }
}

type Members = DashMap<PeerId, mpsc::Sender<RoomEvent>>;

struct NetworkInner {
    /// Room name -> member inboxes
    rooms: DashMap<String, Members>,
    /// Currently injected faults
    faults: DashSet<Fault>,
    /// Counter for generated ids
    next_id: AtomicU64,
}

/// A shared in-process network
#[derive(Clone)]
pub struct MemoryNetwork {
    inner: Arc<NetworkInner>,
}

impl Default for MemoryNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryNetwork {
    /// Create an empty network
    pub fn new() -> Self {
        Self {
            inner: Arc::new(NetworkInner {
                rooms: DashMap::new(),
                faults: DashSet::new(),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Make `fault` fail until cleared
    pub fn inject(&self, fault: Fault) {
        self.inner.faults.insert(fault);
    }

    /// Stop failing `fault`
    pub fn clear(&self, fault: Fault) {
        self.inner.faults.remove(&fault);
    }

    fn check(&self, fault: Fault) -> GossipResult<()> {
        if self.inner.faults.contains(&fault) {
            Err(GossipError::Injected(fault.label()))
        } else {
            Ok(())
        }
    }

    /// Spawn a node with a generated id
    pub fn spawn_node(&self, config: NodeConfig) -> GossipResult<MemoryNode> {
        let n = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.spawn_node_with_id(format!("mem-{:04}", n), config)
    }

    /// Spawn a node with a chosen id
    pub fn spawn_node_with_id(
        &self,
        id: impl Into<String>,
        config: NodeConfig,
    ) -> GossipResult<MemoryNode> {
        self.check(Fault::Spawn)?;
        Ok(MemoryNode {
            id: PeerId::new(id),
            network: self.clone(),
            pubsub_enabled: config.pubsub_enabled,
            event_buffer: config.event_buffer.max(1),
            broadcasts: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Members of a room, sorted
    pub fn room_members(&self, room: &str) -> Vec<PeerId> {
        let mut members: Vec<PeerId> = self
            .inner
            .rooms
            .get(room)
            .map(|m| m.iter().map(|e| e.key().clone()).collect())
            .unwrap_or_default();
        members.sort();
        members
    }

    /// Send `event` to every member of `room` except `skip`
    fn fan_out(&self, room: &str, skip: &PeerId, event: &RoomEvent) {
        let Some(members) = self.inner.rooms.get(room) else {
            return;
        };
        for entry in members.iter() {
            if entry.key() == skip {
                continue;
            }
            if entry.value().try_send(event.clone()).is_err() {
                warn!(room, peer = %entry.key().short_id(), "Dropping event for slow member");
            }
        }
    }
}

/// A node on a [`MemoryNetwork`]
#[derive(Clone)]
pub struct MemoryNode {
    id: PeerId,
    network: MemoryNetwork,
    pubsub_enabled: bool,
    event_buffer: usize,
    broadcasts: Arc<AtomicUsize>,
}

impl MemoryNode {
    /// Our id, without the async trait call
    pub fn peer_id(&self) -> &PeerId {
        &self.id
    }

    /// Number of successful broadcasts across all rooms of this node
    pub fn broadcast_count(&self) -> usize {
        self.broadcasts.load(Ordering::SeqCst)
    }

    /// The network this node lives on
    pub fn network(&self) -> &MemoryNetwork {
        &self.network
    }
}

#[async_trait]
impl PeerNode for MemoryNode {
    type Room = MemoryRoom;
    type Receiver = MemoryRoomReceiver;

    async fn ready(&self) -> GossipResult<()> {
        Ok(())
    }

    async fn id(&self) -> GossipResult<PeerId> {
        self.network.check(Fault::Identity)?;
        Ok(self.id.clone())
    }

    async fn open_room(
        &self,
        name: &str,
    ) -> GossipResult<SplitRoom<MemoryRoom, MemoryRoomReceiver>> {
        self.network.check(Fault::Open)?;
        if !self.pubsub_enabled {
            return Err(GossipError::PubsubDisabled);
        }

        let (tx, rx) = mpsc::channel(self.event_buffer);
        let existing: Vec<PeerId> = {
            let members = self.network.inner.rooms.entry(name.to_string()).or_default();
            if members.contains_key(&self.id) {
                return Err(GossipError::AlreadySubscribed(name.to_string()));
            }
            let existing = members.iter().map(|e| e.key().clone()).collect();
            members.insert(self.id.clone(), tx.clone());
            existing
        };

        // Subscribed first, then one PeerJoined per current neighbor
        let _ = tx.try_send(RoomEvent::Subscribed);
        for peer in &existing {
            let _ = tx.try_send(RoomEvent::PeerJoined(peer.clone()));
        }
        self.network
            .fan_out(name, &self.id, &RoomEvent::PeerJoined(self.id.clone()));

        debug!(room = name, peer = %self.id.short_id(), "Joined in-memory room");

        Ok(SplitRoom {
            sender: MemoryRoom {
                name: name.to_string(),
                id: self.id.clone(),
                network: self.network.clone(),
                broadcasts: self.broadcasts.clone(),
                left: Arc::new(AtomicBool::new(false)),
            },
            receiver: MemoryRoomReceiver { rx },
        })
    }
}

/// Sending half of an in-memory room
#[derive(Clone)]
pub struct MemoryRoom {
    name: String,
    id: PeerId,
    network: MemoryNetwork,
    broadcasts: Arc<AtomicUsize>,
    left: Arc<AtomicBool>,
}

#[async_trait]
impl RoomChannel for MemoryRoom {
    fn name(&self) -> &str {
        &self.name
    }

    async fn broadcast(&self, data: Bytes) -> GossipResult<()> {
        self.network.check(Fault::Broadcast)?;
        if self.left.load(Ordering::SeqCst) {
            return Err(GossipError::NotSubscribed);
        }

        let event = RoomEvent::Message(RoomMessage {
            from: self.id.clone(),
            data,
        });
        self.network.fan_out(&self.name, &self.id, &event);
        self.broadcasts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn leave(&self) -> GossipResult<()> {
        self.network.check(Fault::Leave)?;
        if self.left.swap(true, Ordering::SeqCst) {
            return Err(GossipError::NotSubscribed);
        }

        if let Some(members) = self.network.inner.rooms.get(&self.name) {
            members.remove(&self.id);
        }
        self.network
            .fan_out(&self.name, &self.id, &RoomEvent::PeerLeft(self.id.clone()));
        Ok(())
    }

    fn peers(&self) -> Vec<PeerId> {
        if self.left.load(Ordering::SeqCst) {
            return Vec::new();
        }
        self.network
            .room_members(&self.name)
            .into_iter()
            .filter(|p| p != &self.id)
            .collect()
    }
}

/// Receiving half of an in-memory room
pub struct MemoryRoomReceiver {
    rx: mpsc::Receiver<RoomEvent>,
}

#[async_trait]
impl RoomReceiver for MemoryRoomReceiver {
    async fn recv(&mut self) -> Option<GossipResult<RoomEvent>> {
        self.rx.recv().await.map(Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn next(rx: &mut MemoryRoomReceiver) -> RoomEvent {
        rx.recv().await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_subscribed_is_first_event() {
        let network = MemoryNetwork::new();
        let node = network.spawn_node(NodeConfig::default()).unwrap();
        let mut split = node.open_room("lobby").await.unwrap();
        assert_eq!(next(&mut split.receiver).await, RoomEvent::Subscribed);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_other_members_only() {
        let network = MemoryNetwork::new();
        let alice = network.spawn_node_with_id("alice", NodeConfig::default()).unwrap();
        let bob = network.spawn_node_with_id("bob", NodeConfig::default()).unwrap();

        let mut a = alice.open_room("lobby").await.unwrap();
        let mut b = bob.open_room("lobby").await.unwrap();

        assert_eq!(next(&mut a.receiver).await, RoomEvent::Subscribed);
        assert_eq!(next(&mut a.receiver).await, RoomEvent::PeerJoined("bob".into()));
        assert_eq!(next(&mut b.receiver).await, RoomEvent::Subscribed);
        assert_eq!(next(&mut b.receiver).await, RoomEvent::PeerJoined("alice".into()));

        a.sender.broadcast(Bytes::from_static(b"hi")).await.unwrap();
        assert_eq!(
            next(&mut b.receiver).await,
            RoomEvent::Message(RoomMessage {
                from: "alice".into(),
                data: Bytes::from_static(b"hi"),
            })
        );
        assert!(a.receiver.rx.try_recv().is_err());
        assert_eq!(alice.broadcast_count(), 1);
    }

    #[tokio::test]
    async fn test_rooms_are_isolated() {
        let network = MemoryNetwork::new();
        let alice = network.spawn_node(NodeConfig::default()).unwrap();
        let bob = network.spawn_node(NodeConfig::default()).unwrap();

        let a = alice.open_room("one").await.unwrap();
        let mut b = bob.open_room("two").await.unwrap();
        assert_eq!(next(&mut b.receiver).await, RoomEvent::Subscribed);

        a.sender.broadcast(Bytes::from_static(b"x")).await.unwrap();
        assert!(b.receiver.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_leave_notifies_and_blocks_broadcast() {
        let network = MemoryNetwork::new();
        let alice = network.spawn_node_with_id("alice", NodeConfig::default()).unwrap();
        let bob = network.spawn_node_with_id("bob", NodeConfig::default()).unwrap();

        let a = alice.open_room("lobby").await.unwrap();
        let mut b = bob.open_room("lobby").await.unwrap();
        assert_eq!(a.sender.peers(), vec![PeerId::new("bob")]);

        a.sender.leave().await.unwrap();
        assert_eq!(network.room_members("lobby"), vec![PeerId::new("bob")]);
        assert!(a.sender.peers().is_empty());

        assert_eq!(next(&mut b.receiver).await, RoomEvent::Subscribed);
        assert_eq!(next(&mut b.receiver).await, RoomEvent::PeerJoined("alice".into()));
        assert_eq!(next(&mut b.receiver).await, RoomEvent::PeerLeft("alice".into()));

        assert!(matches!(
            a.sender.broadcast(Bytes::from_static(b"late")).await,
            Err(GossipError::NotSubscribed)
        ));
        assert!(matches!(a.sender.leave().await, Err(GossipError::NotSubscribed)));
    }

    #[tokio::test]
    async fn test_double_open_is_rejected() {
        let network = MemoryNetwork::new();
        let node = network.spawn_node(NodeConfig::default()).unwrap();
        let _first = node.open_room("lobby").await.unwrap();
        assert!(matches!(
            node.open_room("lobby").await,
            Err(GossipError::AlreadySubscribed(_))
        ));
    }

    #[tokio::test]
    async fn test_injected_faults() {
        let network = MemoryNetwork::new();

        network.inject(Fault::Spawn);
        assert!(network.spawn_node(NodeConfig::default()).is_err());
        network.clear(Fault::Spawn);

        let node = network.spawn_node(NodeConfig::default()).unwrap();

        network.inject(Fault::Identity);
        assert!(matches!(node.id().await, Err(GossipError::Injected("identity"))));
        network.clear(Fault::Identity);
        assert!(node.id().await.is_ok());

        let split = node.open_room("lobby").await.unwrap();
        network.inject(Fault::Broadcast);
        assert!(split.sender.broadcast(Bytes::from_static(b"x")).await.is_err());
        assert_eq!(node.broadcast_count(), 0);
    }

    #[tokio::test]
    async fn test_pubsub_disabled() {
        let network = MemoryNetwork::new();
        let node = network
            .spawn_node(NodeConfig::default().with_pubsub(false))
            .unwrap();
        assert!(matches!(
            node.open_room("lobby").await,
            Err(GossipError::PubsubDisabled)
        ));
    }
}
