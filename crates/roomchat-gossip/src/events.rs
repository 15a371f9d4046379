//! Room event types and conversion from iroh-gossip events

use bytes::Bytes;

use crate::identity::PeerId;

/// A payload delivered on a room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomMessage {
    /// The neighbor that delivered the payload
    ///
    /// Gossip carries no origin field, so this is the author only when the
    /// author is a direct neighbor.
    pub from: PeerId,
    /// Opaque payload bytes
    pub data: Bytes,
}

/// Events received from a room
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    /// Our subscription to the room's topic is active; always the first event
    Subscribed,

    /// A payload was received
    Message(RoomMessage),

    /// A peer became a direct neighbor in the room
    PeerJoined(PeerId),

    /// A neighbor left the room
    PeerLeft(PeerId),

    /// We fell behind and missed some messages
    Lagged,
}

impl RoomEvent {
    /// Convert from iroh-gossip event
    pub fn from_gossip_event(event: iroh_gossip::api::Event) -> Self {
        use iroh_gossip::api::Event as GE;

        match event {
            GE::NeighborUp(id) => RoomEvent::PeerJoined(id.into()),
            GE::NeighborDown(id) => RoomEvent::PeerLeft(id.into()),
            GE::Received(msg) => RoomEvent::Message(RoomMessage {
                from: msg.delivered_from.into(),
                data: msg.content,
            }),
            GE::Lagged => RoomEvent::Lagged,
        }
    }

    /// Short name for log lines
    pub fn kind(&self) -> &'static str {
        match self {
            RoomEvent::Subscribed => "subscribed",
            RoomEvent::Message(_) => "message",
            RoomEvent::PeerJoined(_) => "peer_joined",
            RoomEvent::PeerLeft(_) => "peer_left",
            RoomEvent::Lagged => "lagged",
        }
    }
}
