//! # Identity Newtypes
//!
//! Domain-primitive newtypes for identifiers throughout the Triage stack.
//! Each identifier is a distinct type — you cannot pass a [`DoctorId`]
//! where a [`PatientId`] is expected. Code that works for either
//! principal kind is generic over [`PrincipalId`], which carries the
//! role as an associated constant, so the partition travels with the
//! type instead of a runtime argument.
//!
//! UUID-based identifiers are always valid by construction.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::role::Role;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Create an identifier from an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Access the underlying UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }
    };
}

uuid_id! {
    /// A unique identifier for a registered doctor.
    DoctorId
}

uuid_id! {
    /// A unique identifier for a registered patient.
    PatientId
}

uuid_id! {
    /// A unique identifier for a patient-submitted health issue.
    IssueId
}

/// Identifier types that name an authenticated principal.
///
/// Implemented by [`DoctorId`] and [`PatientId`] only — not [`IssueId`].
/// Stores, token issuance, and credential flows are generic over this
/// trait, so a `DoctorId` cannot be handed to patient-partition code:
/// the mismatch is a type error, and the role constant rules out
/// passing the wrong `Role` alongside an id.
pub trait PrincipalId:
    Copy
    + Eq
    + std::hash::Hash
    + std::fmt::Debug
    + std::fmt::Display
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// The partition this identifier type belongs to.
    const ROLE: Role;

    /// Wrap an existing UUID.
    fn from_uuid(id: Uuid) -> Self;

    /// The underlying UUID.
    fn uuid(&self) -> Uuid;
}

impl PrincipalId for DoctorId {
    const ROLE: Role = Role::Doctor;

    fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    fn uuid(&self) -> Uuid {
        self.0
    }
}

impl PrincipalId for PatientId {
    const ROLE: Role = Role::Patient;

    fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    fn uuid(&self) -> Uuid {
        self.0
    }
}
