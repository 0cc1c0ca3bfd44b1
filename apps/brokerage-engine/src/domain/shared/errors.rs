//! Persistence errors.

/// Error raised by a repository adapter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    /// Underlying store failed.
    #[error("storage error: {0}")]
    Storage(String),
}
