//! Opaque peer identity handed out by the substrate

use std::fmt::{self, Display};

use iroh::EndpointId;

/// Peer identity as an opaque string
///
/// For iroh nodes this is the endpoint id (the ed25519 public key in its
/// canonical string form). The chat layer never interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(String);

impl PeerId {
    /// Wrap an id string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The full id string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 8 characters, for log lines and compact display
    pub fn short_id(&self) -> &str {
        match self.0.char_indices().nth(8) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }

    /// Consume into the inner string
    pub fn into_string(self) -> String {
        self.0
    }
}

impl Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<EndpointId> for PeerId {
    fn from(id: EndpointId) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for PeerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}
