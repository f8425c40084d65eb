//! # Principal Roles
//!
//! The two kinds of authenticated principal in the system. The role is
//! carried inside access-token claims and checked by the per-role auth
//! middleware, so a doctor session can never satisfy a patient-only
//! operation or vice versa.

use serde::{Deserialize, Serialize};

/// The role of an authenticated principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A doctor: reviews open issues and writes responses.
    Doctor,
    /// A patient: submits issues and reads their own.
    Patient,
}

impl Role {
    /// Return the string representation of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Doctor => "doctor",
            Self::Patient => "patient",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_str_values() {
        assert_eq!(Role::Doctor.as_str(), "doctor");
        assert_eq!(Role::Patient.as_str(), "patient");
    }

    #[test]
    fn serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Role::Doctor).unwrap(), "\"doctor\"");
        assert_eq!(
            serde_json::to_string(&Role::Patient).unwrap(),
            "\"patient\""
        );
    }

    #[test]
    fn deserializes_from_snake_case() {
        let role: Role = serde_json::from_str("\"patient\"").unwrap();
        assert_eq!(role, Role::Patient);
    }

    #[test]
    fn unknown_role_fails_to_deserialize() {
        assert!(serde_json::from_str::<Role>("\"admin\"").is_err());
    }
}
