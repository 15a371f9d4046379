//! Offline mode: a scripted peer on the in-memory network
//!
//! The peer joins the room first, greets the first neighbor that shows up
//! and then answers every message it receives.

use std::time::Duration;

use bytes::Bytes;
use roomchat_gossip::{
    MemoryNetwork, NodeConfig, PeerNode, RoomChannel, RoomEvent, RoomReceiver,
};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::ChatResult;
use crate::message;

/// Peer id of the scripted peer
pub const DEMO_PEER_ID: &str = "demo-peer";

/// Display name of the scripted peer
pub const DEMO_NAME: &str = "Echo";

const GREETING: &[&str] = &[
    "Hey! Welcome to the roomchat demo.",
    "Everything you type is broadcast to the room as {name, text} JSON.",
    "Try /name to pick a name, /peers to see who is here.",
];

/// Join `room` on `network` with the scripted peer and run it in the background
pub async fn spawn_demo_peer(
    network: &MemoryNetwork,
    room: &str,
    delay: Duration,
) -> ChatResult<JoinHandle<()>> {
    let node = network.spawn_node_with_id(DEMO_PEER_ID, NodeConfig::default())?;
    let split = node.open_room(room).await?;
    Ok(tokio::spawn(run_scripted_peer(
        split.sender,
        split.receiver,
        delay,
    )))
}

/// Reply text for a received message
pub fn reply_to(name: &str, text: Option<&str>) -> String {
    match text {
        Some(text) if !text.is_empty() => format!("{} said: {}", name, text),
        _ => format!("{} sent an empty message", name),
    }
}

async fn say<R: RoomChannel>(room: &R, text: &str) {
    let payload = match message::encode(DEMO_NAME, text) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "Demo peer failed to encode");
            return;
        }
    };
    if let Err(e) = room.broadcast(Bytes::from(payload)).await {
        warn!(error = %e, "Demo peer failed to broadcast");
    }
}

async fn run_scripted_peer<R: RoomChannel, E: RoomReceiver>(
    room: R,
    mut receiver: E,
    delay: Duration,
) {
    let mut greeted = false;
    while let Some(event) = receiver.recv().await {
        match event {
            Ok(RoomEvent::PeerJoined(peer)) if !greeted => {
                debug!(peer = %peer.short_id(), "Demo peer greeting");
                greeted = true;
                for line in GREETING {
                    tokio::time::sleep(delay).await;
                    say(&room, line).await;
                }
            }
            Ok(RoomEvent::Message(msg)) => match message::decode(&msg.data) {
                Ok(chat) => {
                    tokio::time::sleep(delay).await;
                    say(&room, &reply_to(&chat.name, chat.text.as_deref())).await;
                }
                Err(e) => debug!(error = %e, "Demo peer ignoring payload"),
            },
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Demo peer receive error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_text() {
        assert_eq!(reply_to("ada", Some("hi")), "ada said: hi");
        assert_eq!(reply_to("anonymous", None), "anonymous sent an empty message");
    }

    #[tokio::test]
    async fn test_demo_peer_joins_room() {
        let network = MemoryNetwork::new();
        let handle = spawn_demo_peer(&network, "lobby", Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(
            network.room_members("lobby"),
            vec![roomchat_gossip::PeerId::new(DEMO_PEER_ID)]
        );
        handle.abort();
    }
}
