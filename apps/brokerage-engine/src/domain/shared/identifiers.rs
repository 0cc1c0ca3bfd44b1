//! Strongly-typed identifiers for domain entities.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier from a string.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Generate a new unique identifier using UUID v4.
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            /// Get the inner string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

define_id!(AccountId, "Internal identifier of a brokerage account.");
define_id!(PlanId, "Identifier of a scheduled order plan.");
define_id!(
    CredentialHandle,
    "Opaque handle to sealed credential material held by the vault."
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_id_new_and_display() {
        let id = AccountId::new("acct-1");
        assert_eq!(id.as_str(), "acct-1");
        assert_eq!(format!("{id}"), "acct-1");
    }

    #[test]
    fn plan_id_generate_is_unique() {
        assert_ne!(PlanId::generate(), PlanId::generate());
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&PlanId::from("p-1")).unwrap();
        assert_eq!(json, "\"p-1\"");
    }
}
