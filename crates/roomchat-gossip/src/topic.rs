//! Per-room handles for sending and receiving over iroh-gossip

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashSet;
use iroh_gossip::api::{GossipReceiver, GossipSender};
use n0_future::StreamExt;
use tokio::sync::Mutex as TokioMutex;
use tracing::debug;

use crate::error::{GossipError, GossipResult};
use crate::events::RoomEvent;
use crate::identity::PeerId;
use crate::traits::{RoomChannel, RoomReceiver};

/// Gossip topic id for a room: the BLAKE3 hash of the room name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoomTopic(pub [u8; 32]);

impl RoomTopic {
    /// Derive the topic for a room name
    pub fn from_name(name: &str) -> Self {
        Self(*blake3::hash(name.as_bytes()).as_bytes())
    }

    /// Get the underlying bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Handle for sending on a single room
#[derive(Clone)]
pub struct IrohRoom {
    /// Room name
    name: String,
    /// Topic derived from the name
    topic: RoomTopic,
    /// Sender half of the gossip topic; `None` once left
    sender: Arc<TokioMutex<Option<GossipSender>>>,
    /// Current neighbors, maintained by the receiver
    peers: Arc<DashSet<PeerId>>,
    /// The node's set of joined topics
    joined: Arc<DashSet<RoomTopic>>,
}

impl IrohRoom {
    pub(crate) fn new(
        name: &str,
        sender: GossipSender,
        peers: Arc<DashSet<PeerId>>,
        joined: Arc<DashSet<RoomTopic>>,
    ) -> Self {
        Self {
            name: name.to_string(),
            topic: RoomTopic::from_name(name),
            sender: Arc::new(TokioMutex::new(Some(sender))),
            peers,
            joined,
        }
    }

    /// Get the topic id
    pub fn topic(&self) -> RoomTopic {
        self.topic
    }
}

#[async_trait]
impl RoomChannel for IrohRoom {
    fn name(&self) -> &str {
        &self.name
    }

    async fn broadcast(&self, data: Bytes) -> GossipResult<()> {
        let guard = self.sender.lock().await;
        let sender = guard.as_ref().ok_or(GossipError::NotSubscribed)?;
        sender
            .broadcast(data)
            .await
            .map_err(|e| GossipError::BroadcastFailed(e.to_string()))
    }

    async fn leave(&self) -> GossipResult<()> {
        // Dropping the sender (and the receiver, by its owner) leaves the topic
        let sender = self.sender.lock().await.take();
        if sender.is_none() {
            return Err(GossipError::NotSubscribed);
        }
        self.joined.remove(&self.topic);
        self.peers.clear();
        debug!(room = %self.name, "Left room");
        Ok(())
    }

    fn peers(&self) -> Vec<PeerId> {
        let mut peers: Vec<PeerId> = self.peers.iter().map(|p| p.key().clone()).collect();
        peers.sort();
        peers
    }
}

/// Receiver for events from a room
pub struct IrohRoomReceiver {
    /// Receiver half of the gossip topic
    receiver: GossipReceiver,
    /// Whether `Subscribed` has been handed out yet
    announced: bool,
    /// Neighbors shared with the sending half
    peers: Arc<DashSet<PeerId>>,
}

impl IrohRoomReceiver {
    pub(crate) fn new(receiver: GossipReceiver, peers: Arc<DashSet<PeerId>>) -> Self {
        Self {
            receiver,
            announced: false,
            peers,
        }
    }

    /// Check if we've joined the gossip mesh (have at least one neighbor)
    pub fn is_joined(&self) -> bool {
        self.receiver.is_joined()
    }
}

#[async_trait]
impl RoomReceiver for IrohRoomReceiver {
    async fn recv(&mut self) -> Option<GossipResult<RoomEvent>> {
        if !self.announced {
            self.announced = true;
            return Some(Ok(RoomEvent::Subscribed));
        }

        match self.receiver.try_next().await {
            Ok(Some(event)) => {
                let event = RoomEvent::from_gossip_event(event);
                match &event {
                    RoomEvent::PeerJoined(peer) => {
                        self.peers.insert(peer.clone());
                    }
                    RoomEvent::PeerLeft(peer) => {
                        self.peers.remove(peer);
                    }
                    _ => {}
                }
                Some(Ok(event))
            }
            Ok(None) => None,
            Err(e) => Some(Err(GossipError::Other(e.to_string()))),
        }
    }
}
