//! Room addressing.
//!
//! A room is the channel `sessionCode:alias` over which one student's
//! live events are multiplexed to observers. It is derived, never
//! persisted, and exists only while the participant is joined.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The event-bus address for a single participant's live stream.
///
/// Aliases are normalized with `:` stripped before a room is ever
/// formed, so the first `:` in the string is always the delimiter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Build a room id from a canonical session code and a normalized alias.
    pub fn new(code: &str, alias: &str) -> Self {
        Self(format!("{code}:{alias}"))
    }

    /// Parse a room id string. Returns `None` when the delimiter is
    /// missing or either side is empty.
    pub fn parse(s: &str) -> Option<Self> {
        let (code, alias) = s.split_once(':')?;
        if code.is_empty() || alias.is_empty() {
            return None;
        }
        Some(Self(s.to_string()))
    }

    /// The session code part.
    pub fn code(&self) -> &str {
        self.0.split_once(':').map(|(c, _)| c).unwrap_or(&self.0)
    }

    /// The alias part.
    pub fn alias(&self) -> &str {
        self.0.split_once(':').map(|(_, a)| a).unwrap_or("")
    }

    /// The full room id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonicalize a session code: trimmed, uppercase. Lookups are
/// case-insensitive through this.
pub fn canonicalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Normalize an alias: trimmed, with ":" stripped. ":" is the room-id
/// delimiter and must never appear in an alias.
pub fn normalize_alias(alias: &str) -> String {
    alias.trim().replace(':', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_format() {
        let room = RoomId::new("AB3F9Q", "Lærke");
        assert_eq!(room.as_str(), "AB3F9Q:Lærke");
        assert_eq!(room.code(), "AB3F9Q");
        assert_eq!(room.alias(), "Lærke");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(RoomId::parse("no-delimiter").is_none());
        assert!(RoomId::parse(":alias").is_none());
        assert!(RoomId::parse("CODE:").is_none());
        assert!(RoomId::parse("CODE:alias").is_some());
    }

    #[test]
    fn test_code_canonicalization() {
        assert_eq!(canonicalize_code("  ab3f9q "), "AB3F9Q");
        assert_eq!(canonicalize_code("AB3F9Q"), "AB3F9Q");
    }

    #[test]
    fn test_alias_strips_delimiter() {
        assert_eq!(normalize_alias(" Lærke "), "Lærke");
        assert_eq!(normalize_alias("Lær:ke"), "Lærke");
        assert_eq!(normalize_alias(":::"), "");
    }

    #[test]
    fn test_alias_with_extra_colon_splits_on_first() {
        // Normalization strips ":" from aliases, but parsing must still
        // split on the first delimiter only.
        let room = RoomId::parse("CODE:a:b").unwrap();
        assert_eq!(room.code(), "CODE");
        assert_eq!(room.alias(), "a:b");
    }
}
