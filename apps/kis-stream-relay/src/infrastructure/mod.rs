//! Upstream connection, subscriber registry, and relay settings.

pub mod config;
pub mod registry;
pub mod upstream;
