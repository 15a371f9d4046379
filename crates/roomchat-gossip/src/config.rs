//! Configuration for a peer node

use std::fmt;

use iroh::{EndpointId, SecretKey};

use crate::error::{GossipError, GossipResult};

/// Configuration for a peer node
#[derive(Clone)]
pub struct NodeConfig {
    /// Whether rooms may be opened on this node
    pub pubsub_enabled: bool,
    /// Peers to join through when opening a room (endpoint ids)
    pub bootstrap: Vec<String>,
    /// Fixed identity; a fresh key is generated when unset
    pub secret_key: Option<SecretKey>,
    /// Per-room event buffer for the in-memory network
    pub event_buffer: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            pubsub_enabled: true,
            bootstrap: Vec::new(),
            secret_key: None,
            event_buffer: 1024,
        }
    }
}

impl fmt::Debug for NodeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeConfig")
            .field("pubsub_enabled", &self.pubsub_enabled)
            .field("bootstrap", &self.bootstrap)
            .field("event_buffer", &self.event_buffer)
            .finish_non_exhaustive()
    }
}

impl NodeConfig {
    /// Set the bootstrap peers
    pub fn with_bootstrap<S: Into<String>>(mut self, peers: impl IntoIterator<Item = S>) -> Self {
        self.bootstrap = peers.into_iter().map(Into::into).collect();
        self
    }

    /// Enable or disable pubsub
    pub fn with_pubsub(mut self, enabled: bool) -> Self {
        self.pubsub_enabled = enabled;
        self
    }

    /// Use a fixed secret key
    pub fn with_secret_key(mut self, key: SecretKey) -> Self {
        self.secret_key = Some(key);
        self
    }

    /// Parse the bootstrap list into endpoint ids
    pub fn bootstrap_ids(&self) -> GossipResult<Vec<EndpointId>> {
        self.bootstrap
            .iter()
            .map(|peer| {
                peer.trim()
                    .parse::<EndpointId>()
                    .map_err(|e| GossipError::InvalidBootstrapPeer {
                        peer: peer.clone(),
                        reason: e.to_string(),
                    })
            })
            .collect()
    }
}
