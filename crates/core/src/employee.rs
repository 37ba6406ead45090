//! Employee model.

use serde::{Deserialize, Serialize};

use crate::id::EmployeeId;
use crate::Time;

/// An employee who sends updates over WhatsApp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    /// Unique identifier
    pub id: EmployeeId,

    /// Display name
    pub name: String,

    /// Phone number in international format
    pub whatsapp_number: String,

    /// Whether the employee receives messages
    pub status: EmployeeStatus,

    /// When registered
    pub created_at: Time,

    /// Last inbound or outbound activity
    pub last_active: Time,
}

impl Employee {
    /// Register a new active employee.
    pub fn new(name: impl Into<String>, whatsapp_number: impl Into<String>) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: EmployeeId::generate(),
            name: name.into(),
            whatsapp_number: whatsapp_number.into(),
            status: EmployeeStatus::Active,
            created_at: now,
            last_active: now,
        }
    }

    /// Whether messages should be sent to this employee.
    pub fn is_active(&self) -> bool {
        self.status == EmployeeStatus::Active
    }
}

/// Employee status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeStatus {
    /// Receives check-ins
    Active,
    /// Paused
    Inactive,
}

impl EmployeeStatus {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            EmployeeStatus::Active => "active",
            EmployeeStatus::Inactive => "inactive",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_employee_is_active() {
        let employee = Employee::new("Asha", "+919876543210");
        assert!(employee.is_active());
        assert_eq!(employee.created_at, employee.last_active);
    }
}
