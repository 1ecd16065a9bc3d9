//! Strongly-typed identifiers for presenced

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::PresenceError;

/// Identifier of the staff member whose presence is being confirmed
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StaffId(String);

impl StaffId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build a staff id from host input, rejecting blank values
    pub fn parse(id: &str) -> Result<Self, PresenceError> {
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(PresenceError::InvalidStaffId(id.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StaffId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for StaffId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for StaffId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unique identifier for one active staff session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a connected IPC client
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(Uuid);

impl ClientId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_id_equality() {
        let id1 = StaffId::new("staff-1");
        let id2 = StaffId::new("staff-1");
        let id3 = StaffId::new("staff-2");

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
    }

    #[test]
    fn staff_id_parse_trims_and_rejects_blank() {
        assert_eq!(StaffId::parse("  anna ").unwrap().as_str(), "anna");
        assert!(matches!(
            StaffId::parse("   "),
            Err(PresenceError::InvalidStaffId(_))
        ));
        assert!(StaffId::parse("").is_err());
    }

    #[test]
    fn session_id_uniqueness() {
        let s1 = SessionId::new();
        let s2 = SessionId::new();
        assert_ne!(s1, s2);
    }

    #[test]
    fn ids_serialize_deserialize() {
        let staff_id = StaffId::new("staff-7");
        let json = serde_json::to_string(&staff_id).unwrap();
        assert_eq!(json, "\"staff-7\"");
        let parsed: StaffId = serde_json::from_str(&json).unwrap();
        assert_eq!(staff_id, parsed);

        let session_id = SessionId::new();
        let json = serde_json::to_string(&session_id).unwrap();
        let parsed: SessionId = serde_json::from_str(&json).unwrap();
        assert_eq!(session_id, parsed);
    }
}
