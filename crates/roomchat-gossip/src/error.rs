//! Error types for roomchat-gossip

use thiserror::Error;

/// Errors that can occur in the gossip layer
#[derive(Debug, Error)]
pub enum GossipError {
    /// Failed to bind the network endpoint
    #[error("failed to bind endpoint: {0}")]
    BindFailed(String),

    /// A bootstrap peer id could not be parsed
    #[error("invalid bootstrap peer {peer}: {reason}")]
    InvalidBootstrapPeer { peer: String, reason: String },

    /// The node was built with pubsub disabled
    #[error("pubsub is disabled on this node")]
    PubsubDisabled,

    /// The node could not report its identity
    #[error("failed to query node identity: {0}")]
    IdentityUnavailable(String),

    /// Failed to subscribe to topic
    #[error("failed to subscribe to topic: {0}")]
    SubscribeFailed(String),

    /// Failed to broadcast message
    #[error("failed to broadcast message: {0}")]
    BroadcastFailed(String),

    /// Already subscribed to topic
    #[error("already subscribed to room {0}")]
    AlreadySubscribed(String),

    /// Not subscribed to topic
    #[error("not subscribed to topic")]
    NotSubscribed,

    /// Channel closed
    #[error("channel closed")]
    ChannelClosed,

    /// Injected by the in-memory network
    #[error("injected failure: {0}")]
    Injected(&'static str),

    /// Generic gossip error
    #[error("gossip error: {0}")]
    Other(String),
}

/// Result type for gossip operations
pub type GossipResult<T> = Result<T, GossipError>;
