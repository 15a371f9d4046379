//! Error types for roomchat

use roomchat_gossip::GossipError;
use thiserror::Error;

use crate::message::CodecError;

/// Errors that can occur in a chat session
#[derive(Debug, Error)]
pub enum ChatError {
    /// The substrate reported a failure
    #[error(transparent)]
    Gossip(#[from] GossipError),

    /// A payload could not be encoded or decoded
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The peer node was never constructed
    #[error("peer node unavailable: {0}")]
    NodeUnavailable(String),

    /// The session was asked to do something out of order
    #[error("invalid session state: expected {expected}, was {actual}")]
    InvalidPhase {
        expected: &'static str,
        actual: &'static str,
    },
}

/// Result type for chat operations
pub type ChatResult<T> = Result<T, ChatError>;
