//! Chat view-model: the observable state a renderer binds to

use roomchat_gossip::PeerId;
use tracing::warn;

use crate::message::ChatEntry;
use crate::observable::{Computed, Observable};

/// Gateway prefix for the profile link derived from a peer id
pub const PROFILE_URL_BASE: &str = "https://ipfs.io/ipns/";

/// Profile link for a peer id, `None` while the id is unknown
pub fn profile_url(peer_id: Option<&PeerId>) -> Option<String> {
    peer_id.map(|id| format!("{}{}", PROFILE_URL_BASE, id))
}

/// Observable chat state
///
/// Cloning shares the underlying state.
#[derive(Clone, Default)]
pub struct ChatViewModel {
    /// Our display name
    pub name: Observable<String>,
    /// Text being composed; a non-empty write triggers a send
    pub message_draft: Observable<String>,
    /// Message log, newest first
    pub messages: Observable<Vec<ChatEntry>>,
    /// Our peer id, set once the node is ready
    pub peer_id: Observable<Option<PeerId>>,
    /// Whether the room subscription is active
    pub subscribed: Observable<bool>,
    /// Last error, overwritten by each new one
    pub error: Observable<Option<String>>,
    /// Current room neighbors, sorted
    pub peers: Observable<Vec<PeerId>>,
}

impl ChatViewModel {
    pub fn new(name: impl Into<String>) -> Self {
        let vm = Self::default();
        vm.name.set(name.into());
        vm
    }

    pub fn set_name(&self, name: impl Into<String>) {
        self.name.set(name.into());
    }

    pub fn set_message_draft(&self, text: impl Into<String>) {
        self.message_draft.set(text.into());
    }

    /// Prepend an entry to the log
    pub fn append_incoming(&self, entry: ChatEntry) {
        self.messages.update(|log| log.insert(0, entry));
    }

    /// Record our peer id; later calls are ignored
    ///
    /// Returns whether the id was stored.
    pub fn set_peer_id(&self, id: PeerId) -> bool {
        if let Some(existing) = self.peer_id.get() {
            warn!(existing = %existing, ignored = %id, "Peer id already set");
            return false;
        }
        self.peer_id.set(Some(id));
        true
    }

    pub fn set_subscribed(&self, subscribed: bool) {
        self.subscribed.set(subscribed);
    }

    pub fn set_error(&self, error: impl ToString) {
        self.error.set(Some(error.to_string()));
    }

    pub fn clear_error(&self) {
        self.error.set(None);
    }

    /// Add a room neighbor, keeping the list sorted and unique
    pub fn peer_joined(&self, peer: PeerId) {
        self.peers.update(|peers| {
            if let Err(pos) = peers.binary_search(&peer) {
                peers.insert(pos, peer);
            }
        });
    }

    pub fn peer_left(&self, peer: &PeerId) {
        self.peers.update(|peers| peers.retain(|p| p != peer));
    }

    /// Forget all neighbors
    pub fn clear_peers(&self) {
        self.peers.set(Vec::new());
    }

    /// Current profile link
    pub fn profile_url(&self) -> Option<String> {
        self.peer_id.with(|id| profile_url(id.as_ref()))
    }

    /// Profile link as a derived observable
    pub fn profile_url_computed(&self) -> Computed<Option<PeerId>, Option<String>> {
        Computed::new(&self.peer_id, |id| profile_url(id.as_ref()))
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed.get()
    }

    pub fn message_count(&self) -> usize {
        self.messages.with(Vec::len)
    }
}
