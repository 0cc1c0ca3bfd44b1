//! Session Adapters
//!
//! Token issuers and the session lifecycle manager that implements
//! `TokenProvider`.

mod issuer;
mod manager;

pub use issuer::{
    BearerToken, DirectTokenIssuer, IssuerError, PRIMARY_TIMEOUT, PrimaryTokenSource,
    SYNC_KEY_HEADER,
};
pub use manager::{SessionManager, SweepReport};
