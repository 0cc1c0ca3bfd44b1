//! Shared Domain Types
//!
//! Identifiers and storage errors shared across bounded contexts.

mod errors;
mod identifiers;

pub use errors::RepositoryError;
pub use identifiers::{AccountId, CredentialHandle, PlanId};
