//! Newtype domain identifiers.
//!
//! Every domain concept that has an identity is represented as a distinct
//! newtype wrapping a primitive. This prevents accidentally interchanging —
//! for example — a [`WorkflowName`] with a free-form message string even
//! though both are `String` under the hood.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers — String-backed (GitHub-assigned names)
// ---------------------------------------------------------------------------

string_id! {
    /// The configured name of a GitHub Actions workflow (e.g.
    /// `"Build documentation"`).
    ///
    /// Workflow names are the grouping key for every projection query: the
    /// bounded log may hold many run events for one name, and queries merge
    /// them down to the single most recently updated run per name.
    WorkflowName
}

string_id! {
    /// Identifies a GitHub repository in `"owner/repo"` format.
    ///
    /// Taken from the `repository.full_name` field of webhook payloads when
    /// present; used for provenance in stored events and notification text.
    RepositoryId
}

// ---------------------------------------------------------------------------
// Identifiers — UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies a single relay process run.
///
/// Generated fresh at startup; reported by the service-info endpoint and
/// attached to spans so all activity from one process can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelayRunId(Uuid);

impl RelayRunId {
    /// Generates a new random run identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a [`RelayRunId`] from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for RelayRunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_workflow_name_is_rejected() {
        assert!(WorkflowName::new("").is_none());
        assert_eq!(
            WorkflowName::new("Build documentation").unwrap().as_str(),
            "Build documentation"
        );
    }

    #[test]
    fn run_ids_are_unique() {
        assert_ne!(RelayRunId::new_random(), RelayRunId::new_random());
    }
}
