//! Chat session: wires a peer node, its room and the view-model together
//!
//! The session is the only component with sequencing logic:
//!
//! 1. record a failed node construction in the error slot
//! 2. [`ChatSession::start`]: wait for the node, read our id, open the room
//! 3. [`ChatSession::run`]: apply room events to the view-model and
//!    broadcast drafts until shutdown
//!
//! [`ChatSession::run_until`] chains 2 and 3 so that shutdown is honored
//! even while the node is still starting.
//! 4. [`ChatSession::leave`] the room on the way out
//!
//! Every failure is logged and written into the view-model's error slot;
//! none of them aborts the session.

use std::future::Future;

use bytes::Bytes;
use roomchat_gossip::{GossipResult, PeerId, PeerNode, RoomChannel, RoomEvent, RoomReceiver};
use roomchat_logging::spans;
use tokio::sync::mpsc;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config::ChatConfig;
use crate::error::{ChatError, ChatResult};
use crate::message::{self, ChatEntry};
use crate::observable::ListenerId;
use crate::view_model::ChatViewModel;

/// Where a session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    NodeReady,
    ChannelOpen,
    Subscribed,
    Left,
}

impl SessionPhase {
    fn as_str(self) -> &'static str {
        match self {
            SessionPhase::Uninitialized => "uninitialized",
            SessionPhase::NodeReady => "node_ready",
            SessionPhase::ChannelOpen => "channel_open",
            SessionPhase::Subscribed => "subscribed",
            SessionPhase::Left => "left",
        }
    }
}

/// Why a draft was not sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotSubscribed,
    EmptyDraft,
}

/// Result of handling one draft
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Sent,
    Skipped(SkipReason),
    Failed,
}

/// A chat session over any [`PeerNode`]
pub struct ChatSession<N: PeerNode> {
    view: ChatViewModel,
    config: ChatConfig,
    node: Option<N>,
    own_id: Option<PeerId>,
    room: Option<N::Room>,
    receiver: Option<N::Receiver>,
    phase: SessionPhase,
    drafts_tx: mpsc::UnboundedSender<String>,
    drafts_rx: mpsc::UnboundedReceiver<String>,
    draft_listener: Option<ListenerId>,
}

impl<N: PeerNode> ChatSession<N> {
    /// Create a session from the outcome of node construction
    ///
    /// A construction failure is recorded and the session stays usable,
    /// but [`ChatSession::start`] will fail.
    pub fn new(view: ChatViewModel, config: ChatConfig, node: GossipResult<N>) -> Self {
        let node = match node {
            Ok(node) => Some(node),
            Err(e) => {
                error!(error = %e, "Failed to initialize peer");
                view.set_error(&e);
                None
            }
        };

        let (drafts_tx, drafts_rx) = mpsc::unbounded_channel();
        Self {
            view,
            config,
            node,
            own_id: None,
            room: None,
            receiver: None,
            phase: SessionPhase::Uninitialized,
            drafts_tx,
            drafts_rx,
            draft_listener: None,
        }
    }

    pub fn view(&self) -> &ChatViewModel {
        &self.view
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn node(&self) -> Option<&N> {
        self.node.as_ref()
    }

    /// The open room, if any
    pub fn room(&self) -> Option<&N::Room> {
        self.room.as_ref()
    }

    /// Wait for the node, publish our id and open the room
    ///
    /// Failures are recorded in the error slot and returned.
    pub async fn start(&mut self) -> ChatResult<()> {
        let result = self.try_start().await;
        if let Err(e) = &result {
            error!(error = %e, room = %self.config.room, "Failed to setup chat room");
            self.view.set_error(e);
        }
        result
    }

    async fn try_start(&mut self) -> ChatResult<()> {
        if self.phase != SessionPhase::Uninitialized {
            return Err(ChatError::InvalidPhase {
                expected: SessionPhase::Uninitialized.as_str(),
                actual: self.phase.as_str(),
            });
        }
        let node = self.node.as_ref().ok_or_else(|| {
            ChatError::NodeUnavailable("node construction failed".to_string())
        })?;

        node.ready()
            .instrument(info_span!(spans::NODE_READY))
            .await?;
        self.phase = SessionPhase::NodeReady;

        let id = node.id().await?;
        info!(peer_id = %id.short_id(), "Node ready");
        self.view.set_peer_id(id.clone());
        self.own_id = Some(id);

        let split = node.open_room(&self.config.room).await?;
        self.room = Some(split.sender);
        self.receiver = Some(split.receiver);
        self.phase = SessionPhase::ChannelOpen;

        // Drafts are sent from the session loop, in the order they were typed
        let tx = self.drafts_tx.clone();
        self.draft_listener = Some(self.view.message_draft.on_change(move |text| {
            let _ = tx.send(text.clone());
        }));

        info!(room = %self.config.room, "Ready for chat");
        Ok(())
    }

    /// Apply one room event to the view-model
    pub fn handle_event(&mut self, event: RoomEvent) {
        debug!(kind = event.kind(), "Room event");
        match event {
            RoomEvent::Subscribed => {
                self.phase = SessionPhase::Subscribed;
                self.view.set_subscribed(true);
            }
            RoomEvent::Message(msg) => match message::decode(&msg.data) {
                Ok(chat) => {
                    self.view.append_incoming(ChatEntry::received(chat, msg.from));
                }
                Err(e) => {
                    warn!(
                        from = %msg.from.short_id(),
                        bytes = msg.data.len(),
                        error = %e,
                        "Dropping malformed chat payload"
                    );
                }
            },
            RoomEvent::PeerJoined(peer) => {
                info!(peer = %peer.short_id(), "Peer joined room");
                self.view.peer_joined(peer);
            }
            RoomEvent::PeerLeft(peer) => {
                info!(peer = %peer.short_id(), "Peer left room");
                self.view.peer_left(&peer);
            }
            RoomEvent::Lagged => {
                warn!("Fell behind on room events; some messages were missed");
            }
        }
    }

    /// Broadcast one draft
    ///
    /// Skipped while unsubscribed or when `text` is empty. After an attempt
    /// the draft is cleared whether or not the broadcast succeeded.
    pub async fn publish_draft(&mut self, text: &str) -> PublishOutcome {
        if !self.view.is_subscribed() {
            return PublishOutcome::Skipped(SkipReason::NotSubscribed);
        }
        if text.is_empty() {
            return PublishOutcome::Skipped(SkipReason::EmptyDraft);
        }
        let Some(room) = &self.room else {
            return PublishOutcome::Skipped(SkipReason::NotSubscribed);
        };

        let name = self.view.name.get();
        let result = async {
            let payload = message::encode(&name, text)?;
            room.broadcast(Bytes::from(payload)).await?;
            Ok::<_, ChatError>(())
        }
        .instrument(info_span!(spans::PUBLISH_DRAFT, bytes = text.len()))
        .await;

        let outcome = match result {
            Ok(()) => {
                if let Some(id) = &self.own_id {
                    self.view.append_incoming(ChatEntry::sent(&name, text, id.clone()));
                }
                PublishOutcome::Sent
            }
            Err(e) => {
                error!(error = %e, "Failed to publish message");
                self.view.set_error(&e);
                PublishOutcome::Failed
            }
        };

        self.view.set_message_draft("");
        outcome
    }

    /// Publish every draft queued so far
    pub async fn flush_drafts(&mut self) -> Vec<PublishOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(text) = self.drafts_rx.try_recv() {
            outcomes.push(self.publish_draft(&text).await);
        }
        outcomes
    }

    /// Apply every room event that is already available
    pub async fn drain_events(&mut self) -> usize {
        let mut count = 0;
        while let Ok(Some(Ok(event))) = tokio::time::timeout(
            std::time::Duration::ZERO,
            next_event(&mut self.receiver),
        )
        .await
        {
            self.handle_event(event);
            count += 1;
        }
        count
    }

    /// Drive the session until `shutdown` resolves, then leave the room
    pub async fn run(&mut self, shutdown: impl Future<Output = ()>) -> ChatResult<()> {
        let span = info_span!(spans::CHAT_SESSION, room = %self.config.room);
        async {
            tokio::pin!(shutdown);
            loop {
                tokio::select! {
                    _ = &mut shutdown => {
                        info!("Shutting down chat session");
                        break;
                    }
                    Some(text) = self.drafts_rx.recv() => {
                        self.publish_draft(&text).await;
                    }
                    event = next_event(&mut self.receiver) => match event {
                        Some(Ok(event)) => self.handle_event(event),
                        Some(Err(e)) => warn!(error = %e, "Room receive error"),
                        None => {
                            info!("Room closed");
                            self.receiver = None;
                        }
                    },
                }
            }

            self.finish().await;
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Start the session and drive it until `shutdown` resolves
    ///
    /// Shutdown is honored while the node is still starting. A failed start
    /// is already in the error slot, so the session keeps running until
    /// shutdown either way.
    pub async fn run_until(&mut self, shutdown: impl Future<Output = ()>) -> ChatResult<()> {
        tokio::pin!(shutdown);
        tokio::select! {
            _ = self.start() => {}
            _ = &mut shutdown => {
                info!(phase = self.phase.as_str(), "Shutdown requested before the session started");
                self.finish().await;
                return Ok(());
            }
        }
        self.run(shutdown).await
    }

    /// Leave the room and stop the node
    async fn finish(&mut self) {
        // Failure is already logged by leave
        let _ = self.leave().await;

        if let Some(node) = &self.node
            && let Err(e) = node.shutdown().await
        {
            warn!(error = %e, "Node shutdown failed");
        }
    }

    /// Depart from the room
    ///
    /// A failure is logged but not written to the error slot. Either way
    /// the session counts as unsubscribed afterwards.
    pub async fn leave(&mut self) -> ChatResult<()> {
        let Some(room) = self.room.take() else {
            return Ok(());
        };
        if let Some(id) = self.draft_listener.take() {
            self.view.message_draft.remove_listener(id);
        }
        self.receiver = None;

        let result = room
            .leave()
            .instrument(info_span!(spans::ROOM_LEAVE, room = %room.name()))
            .await;
        match &result {
            Ok(()) => info!(room = %room.name(), "Left room"),
            Err(e) => error!(room = %room.name(), error = %e, "Failed to leave room"),
        }

        self.view.set_subscribed(false);
        self.view.clear_peers();
        self.phase = SessionPhase::Left;
        result.map_err(ChatError::from)
    }
}

/// Next event from the room, or never once there is no receiver
async fn next_event<R: RoomReceiver>(
    receiver: &mut Option<R>,
) -> Option<GossipResult<RoomEvent>> {
    match receiver {
        Some(r) => r.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use roomchat_gossip::{
        Fault, GossipError, MemoryNetwork, MemoryNode, MemoryRoom, MemoryRoomReceiver,
        NodeConfig, RoomMessage, SplitRoom,
    };
    use tokio::sync::oneshot;

    /// A node that never comes online
    struct StalledNode;

    #[async_trait]
    impl PeerNode for StalledNode {
        type Room = MemoryRoom;
        type Receiver = MemoryRoomReceiver;

        async fn ready(&self) -> GossipResult<()> {
            std::future::pending().await
        }

        async fn id(&self) -> GossipResult<PeerId> {
            Err(GossipError::IdentityUnavailable("never ready".into()))
        }

        async fn open_room(
            &self,
            _name: &str,
        ) -> GossipResult<SplitRoom<MemoryRoom, MemoryRoomReceiver>> {
            Err(GossipError::SubscribeFailed("never ready".into()))
        }
    }

    fn session(network: &MemoryNetwork, id: &str) -> ChatSession<MemoryNode> {
        let node = network.spawn_node_with_id(id, NodeConfig::default());
        ChatSession::new(ChatViewModel::new(id), ChatConfig::default(), node)
    }

    async fn subscribed(network: &MemoryNetwork, id: &str) -> ChatSession<MemoryNode> {
        let mut s = session(network, id);
        s.start().await.unwrap();
        s.drain_events().await;
        assert!(s.view().is_subscribed());
        s
    }

    #[tokio::test]
    async fn test_start_sets_peer_id_and_opens_room() {
        let network = MemoryNetwork::new();
        let mut s = session(&network, "QmAbc123");
        s.start().await.unwrap();

        assert_eq!(s.phase(), SessionPhase::ChannelOpen);
        assert_eq!(
            s.view().profile_url().as_deref(),
            Some("https://ipfs.io/ipns/QmAbc123")
        );
        assert!(!s.view().is_subscribed());

        s.drain_events().await;
        assert_eq!(s.phase(), SessionPhase::Subscribed);
        assert!(s.view().is_subscribed());
        assert_eq!(network.room_members("test-room-1234"), vec![PeerId::new("QmAbc123")]);
    }

    #[tokio::test]
    async fn test_start_twice_is_rejected() {
        let network = MemoryNetwork::new();
        let mut s = session(&network, "a");
        s.start().await.unwrap();
        assert!(matches!(s.start().await, Err(ChatError::InvalidPhase { .. })));
    }

    #[tokio::test]
    async fn test_send_is_noop_while_unsubscribed() {
        let network = MemoryNetwork::new();
        let mut s = session(&network, "a");
        s.start().await.unwrap();

        assert_eq!(
            s.publish_draft("hello").await,
            PublishOutcome::Skipped(SkipReason::NotSubscribed)
        );
        assert_eq!(s.node().unwrap().broadcast_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_draft_is_noop() {
        let network = MemoryNetwork::new();
        let mut s = subscribed(&network, "a").await;

        assert_eq!(
            s.publish_draft("").await,
            PublishOutcome::Skipped(SkipReason::EmptyDraft)
        );
        assert_eq!(s.view().message_draft.get(), "");
        assert_eq!(s.node().unwrap().broadcast_count(), 0);
    }

    #[tokio::test]
    async fn test_successful_send_clears_draft_and_echoes() {
        let network = MemoryNetwork::new();
        let mut s = subscribed(&network, "a").await;

        s.view().set_message_draft("hello");
        let outcomes = s.flush_drafts().await;

        assert_eq!(outcomes[0], PublishOutcome::Sent);
        assert_eq!(s.view().message_draft.get(), "");
        assert_eq!(s.node().unwrap().broadcast_count(), 1);

        let log = s.view().messages.get();
        assert_eq!(log.len(), 1);
        assert!(log[0].local);
        assert_eq!(log[0].name, "a");
        assert_eq!(log[0].text.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_failed_send_clears_draft_and_sets_error() {
        let network = MemoryNetwork::new();
        let mut s = subscribed(&network, "a").await;
        network.inject(Fault::Broadcast);

        s.view().set_message_draft("doomed");
        let outcomes = s.flush_drafts().await;

        assert_eq!(outcomes[0], PublishOutcome::Failed);
        assert_eq!(s.view().message_draft.get(), "");
        assert!(s.view().error.get().is_some());
        assert_eq!(s.view().message_count(), 0);
    }

    #[tokio::test]
    async fn test_incoming_messages_are_prepended() {
        let network = MemoryNetwork::new();
        let mut s = subscribed(&network, "a").await;

        for (i, text) in ["m1", "m2", "m3"].iter().enumerate() {
            let payload = message::encode(&format!("peer{}", i), text).unwrap();
            s.handle_event(RoomEvent::Message(RoomMessage {
                from: PeerId::new("remote"),
                data: Bytes::from(payload),
            }));
        }

        let texts: Vec<_> = s
            .view()
            .messages
            .get()
            .into_iter()
            .map(|e| e.text.unwrap_or_default())
            .collect();
        assert_eq!(texts, vec!["m3", "m2", "m1"]);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_dropped() {
        let network = MemoryNetwork::new();
        let mut s = subscribed(&network, "a").await;

        s.handle_event(RoomEvent::Message(RoomMessage {
            from: PeerId::new("remote"),
            data: Bytes::from_static(b"{not json"),
        }));

        assert_eq!(s.view().message_count(), 0);
        assert_eq!(s.view().error.get(), None);
    }

    #[tokio::test]
    async fn test_construction_failure_is_recorded() {
        let network = MemoryNetwork::new();
        network.inject(Fault::Spawn);
        let mut s = session(&network, "a");

        assert!(s.view().error.get().is_some());
        assert!(matches!(s.start().await, Err(ChatError::NodeUnavailable(_))));
        assert_eq!(s.view().peer_id.get(), None);
    }

    #[tokio::test]
    async fn test_identity_failure_is_recorded() {
        let network = MemoryNetwork::new();
        network.inject(Fault::Identity);
        let mut s = session(&network, "a");

        assert!(s.start().await.is_err());
        assert!(s.view().error.get().unwrap().contains("identity"));
        assert_eq!(s.phase(), SessionPhase::NodeReady);
    }

    #[tokio::test]
    async fn test_open_failure_is_recorded() {
        let network = MemoryNetwork::new();
        network.inject(Fault::Open);
        let mut s = session(&network, "a");

        assert!(s.start().await.is_err());
        assert!(s.view().error.get().is_some());
        assert!(s.room().is_none());
        assert_eq!(s.view().peer_id.get(), Some(PeerId::new("a")));
    }

    #[tokio::test]
    async fn test_leave_unsubscribes_and_stops_sending() {
        let network = MemoryNetwork::new();
        let mut s = subscribed(&network, "a").await;

        s.leave().await.unwrap();
        assert_eq!(s.phase(), SessionPhase::Left);
        assert!(!s.view().is_subscribed());
        assert!(network.room_members("test-room-1234").is_empty());

        s.view().set_message_draft("too late");
        assert!(s.flush_drafts().await.is_empty());
        assert_eq!(
            s.publish_draft("too late").await,
            PublishOutcome::Skipped(SkipReason::NotSubscribed)
        );
        assert_eq!(s.node().unwrap().broadcast_count(), 0);
    }

    #[tokio::test]
    async fn test_leave_failure_is_logged_only() {
        let network = MemoryNetwork::new();
        let mut s = subscribed(&network, "a").await;
        network.inject(Fault::Leave);

        assert!(s.leave().await.is_err());
        assert_eq!(s.view().error.get(), None);
        assert!(!s.view().is_subscribed());
    }

    #[tokio::test]
    async fn test_peer_membership_updates_view() {
        let network = MemoryNetwork::new();
        let mut a = subscribed(&network, "a").await;
        let mut b = subscribed(&network, "b").await;

        a.drain_events().await;
        assert_eq!(a.view().peers.get(), vec![PeerId::new("b")]);
        assert_eq!(b.view().peers.get(), vec![PeerId::new("a")]);

        b.leave().await.unwrap();
        a.drain_events().await;
        assert!(a.view().peers.get().is_empty());
    }

    #[tokio::test]
    async fn test_failed_construction_keeps_running_until_shutdown() {
        let network = MemoryNetwork::new();
        network.inject(Fault::Spawn);
        let mut s = session(&network, "a");
        let view = s.view().clone();

        let (stop, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let result = s
                .run_until(async move {
                    let _ = stopped.await;
                })
                .await;
            (s, result)
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!task.is_finished());

        view.set_message_draft("nobody hears this");
        stop.send(()).unwrap();
        let (s, result) = task.await.unwrap();

        assert!(result.is_ok());
        assert!(view.error.get().is_some());
        assert!(s.room().is_none());
    }

    #[tokio::test]
    async fn test_shutdown_while_node_is_starting() {
        let mut s = ChatSession::new(
            ChatViewModel::new("a"),
            ChatConfig::default(),
            Ok(StalledNode),
        );

        let (stop, stopped) = oneshot::channel::<()>();
        stop.send(()).unwrap();

        let result = tokio::time::timeout(
            Duration::from_secs(1),
            s.run_until(async move {
                let _ = stopped.await;
            }),
        )
        .await
        .expect("shutdown was not honored during startup");

        assert!(result.is_ok());
        assert_eq!(s.phase(), SessionPhase::Uninitialized);
        assert_eq!(s.view().peer_id.get(), None);
        assert_eq!(s.view().error.get(), None);
    }

    #[tokio::test]
    async fn test_run_until_starts_and_leaves() {
        let network = MemoryNetwork::new();
        let mut s = session(&network, "a");
        let view = s.view().clone();

        let (stop, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            s.run_until(async move {
                let _ = stopped.await;
            })
            .await
        });

        tokio::time::timeout(Duration::from_secs(1), async {
            while !view.is_subscribed() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        stop.send(()).unwrap();
        task.await.unwrap().unwrap();
        assert!(!view.is_subscribed());
        assert!(network.room_members("test-room-1234").is_empty());
    }
}
