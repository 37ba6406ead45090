//! Unique identifiers for standup entities.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Identifier of an employee.
///
/// The employee directory hands out opaque strings (UUIDs in practice), so
/// this wraps a string rather than generating its own ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmployeeId(String);

impl EmployeeId {
    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh identifier for a newly registered employee.
    pub fn generate() -> Self {
        Self(Ulid::new().to_string().to_lowercase())
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EmployeeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EmployeeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::str::FromStr for EmployeeId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

/// Unique identifier for a stored feedback record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedbackId(Ulid);

impl FeedbackId {
    /// Generate a new FeedbackId
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for FeedbackId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for FeedbackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for FeedbackId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Unique identifier for a message log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageLogId(Ulid);

impl MessageLogId {
    /// Generate a new MessageLogId
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for MessageLogId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageLogId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for MessageLogId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_employee_id_roundtrips_through_display() {
        let id = EmployeeId::from("bf615338-8a52-450e-ba5d-5ac172936d93");
        assert_eq!(id.to_string(), "bf615338-8a52-450e-ba5d-5ac172936d93");
        assert_eq!(id.as_str(), "bf615338-8a52-450e-ba5d-5ac172936d93");
    }

    #[test]
    fn test_employee_id_serializes_as_plain_string() {
        let id = EmployeeId::new("E1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"E1\"");
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        assert_ne!(EmployeeId::generate(), EmployeeId::generate());
        assert_ne!(FeedbackId::new(), FeedbackId::new());
    }

    #[test]
    fn test_feedback_id_parse() {
        let id = FeedbackId::new();
        let parsed: FeedbackId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }
}
