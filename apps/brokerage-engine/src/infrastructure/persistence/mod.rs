//! Persistence Adapters
//!
//! In-memory implementations of the repository traits.

pub mod in_memory;

pub use in_memory::{
    InMemoryAccountRepository, InMemoryAssetHistory, InMemoryExecutionLog, InMemoryPlanRepository,
};
