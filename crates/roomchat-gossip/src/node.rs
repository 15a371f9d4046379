//! Peer node backed by an iroh endpoint and iroh-gossip

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashSet;
use iroh::protocol::Router;
use iroh::{Endpoint, EndpointId, SecretKey};
use iroh_gossip::net::{Gossip, GOSSIP_ALPN};
use tracing::{info, instrument};

use crate::config::NodeConfig;
use crate::error::{GossipError, GossipResult};
use crate::identity::PeerId;
use crate::topic::{IrohRoom, IrohRoomReceiver, RoomTopic};
use crate::traits::{PeerNode, SplitRoom};

/// A peer node on the iroh network
///
/// Owns the endpoint, the gossip protocol handler and the router that
/// dispatches incoming gossip connections.
pub struct IrohPeerNode {
    /// The bound endpoint
    endpoint: Endpoint,
    /// The underlying iroh-gossip instance
    gossip: Gossip,
    /// Router accepting the gossip ALPN
    router: Router,
    /// Parsed bootstrap peers
    bootstrap: Vec<EndpointId>,
    /// Whether rooms may be opened
    pubsub_enabled: bool,
    /// Topics currently joined
    joined: Arc<DashSet<RoomTopic>>,
}

impl IrohPeerNode {
    /// Bind an endpoint and spawn the gossip protocol on it
    #[instrument(name = "node_spawn", skip(config))]
    pub async fn spawn(config: NodeConfig) -> GossipResult<Self> {
        let bootstrap = config.bootstrap_ids()?;
        let secret_key = config
            .secret_key
            .unwrap_or_else(|| SecretKey::generate(&mut rand::rng()));

        let endpoint = Endpoint::builder()
            .secret_key(secret_key)
            .bind()
            .await
            .map_err(|e| GossipError::BindFailed(e.to_string()))?;

        let gossip = Gossip::builder().spawn(endpoint.clone());
        let router = Router::builder(endpoint.clone())
            .accept(GOSSIP_ALPN, gossip.clone())
            .spawn();

        info!(
            endpoint_id = %endpoint.id().fmt_short(),
            bootstrap = bootstrap.len(),
            "Peer node spawned"
        );

        Ok(Self {
            endpoint,
            gossip,
            router,
            bootstrap,
            pubsub_enabled: config.pubsub_enabled,
            joined: Arc::new(DashSet::new()),
        })
    }

    /// Get our endpoint ID
    pub fn endpoint_id(&self) -> EndpointId {
        self.endpoint.id()
    }

    /// Get the underlying endpoint
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Get number of joined rooms
    pub fn room_count(&self) -> usize {
        self.joined.len()
    }
}

#[async_trait]
impl PeerNode for IrohPeerNode {
    type Room = IrohRoom;
    type Receiver = IrohRoomReceiver;

    async fn ready(&self) -> GossipResult<()> {
        self.endpoint.online().await;
        Ok(())
    }

    async fn id(&self) -> GossipResult<PeerId> {
        Ok(PeerId::from(self.endpoint.id()))
    }

    #[instrument(name = "room_open", skip(self))]
    async fn open_room(&self, name: &str) -> GossipResult<SplitRoom<IrohRoom, IrohRoomReceiver>> {
        if !self.pubsub_enabled {
            return Err(GossipError::PubsubDisabled);
        }

        let topic = RoomTopic::from_name(name);
        if !self.joined.insert(topic) {
            return Err(GossipError::AlreadySubscribed(name.to_string()));
        }

        let gossip_topic = match self
            .gossip
            .subscribe(topic.0.into(), self.bootstrap.clone())
            .await
        {
            Ok(t) => t,
            Err(e) => {
                self.joined.remove(&topic);
                return Err(GossipError::SubscribeFailed(e.to_string()));
            }
        };

        // Split into sender and receiver
        let (sender, receiver) = gossip_topic.split();
        let peers = Arc::new(DashSet::new());

        info!(room = name, "Subscribed to room topic");

        Ok(SplitRoom {
            sender: IrohRoom::new(name, sender, peers.clone(), self.joined.clone()),
            receiver: IrohRoomReceiver::new(receiver, peers),
        })
    }

    async fn shutdown(&self) -> GossipResult<()> {
        self.router
            .shutdown()
            .await
            .map_err(|e| GossipError::Other(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{RoomChannel, RoomReceiver};
    use crate::events::RoomEvent;

    #[tokio::test]
    #[ignore = "Binds a real endpoint - run with --ignored"]
    async fn test_open_room_announces_subscription() {
        let node = IrohPeerNode::spawn(NodeConfig::default()).await.unwrap();
        let mut split = node.open_room("test-room-1234").await.unwrap();

        assert_eq!(split.sender.name(), "test-room-1234");
        assert_eq!(split.receiver.recv().await.unwrap().unwrap(), RoomEvent::Subscribed);
        assert!(matches!(
            node.open_room("test-room-1234").await,
            Err(GossipError::AlreadySubscribed(_))
        ));

        split.sender.leave().await.unwrap();
        assert_eq!(node.room_count(), 0);
        node.shutdown().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "Binds a real endpoint - run with --ignored"]
    async fn test_pubsub_disabled_rejects_rooms() {
        let node = IrohPeerNode::spawn(NodeConfig::default().with_pubsub(false))
            .await
            .unwrap();
        assert!(matches!(
            node.open_room("lobby").await,
            Err(GossipError::PubsubDisabled)
        ));
        node.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_bootstrap_fails_before_binding() {
        let result =
            IrohPeerNode::spawn(NodeConfig::default().with_bootstrap(["nope"])).await;
        assert!(matches!(result, Err(GossipError::InvalidBootstrapPeer { .. })));
    }
}
