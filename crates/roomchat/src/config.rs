//! Chat session configuration

/// Room joined when none is configured
pub const DEFAULT_ROOM: &str = "test-room-1234";

/// What a session joins and who it claims to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Room name; peers using the same name share a room
    pub room: String,
    /// Initial display name; may be empty
    pub name: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            room: DEFAULT_ROOM.to_string(),
            name: String::new(),
        }
    }
}

impl ChatConfig {
    /// Set the room name; blank names fall back to [`DEFAULT_ROOM`]
    pub fn with_room(mut self, room: impl Into<String>) -> Self {
        let room = room.into();
        self.room = if room.trim().is_empty() {
            DEFAULT_ROOM.to_string()
        } else {
            room
        };
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_room() {
        let config = ChatConfig::default();
        assert_eq!(config.room, "test-room-1234");
        assert!(config.name.is_empty());
    }

    #[test]
    fn test_blank_room_falls_back() {
        assert_eq!(ChatConfig::default().with_room("  ").room, DEFAULT_ROOM);
        assert_eq!(ChatConfig::default().with_room("lobby").room, "lobby");
    }
}
