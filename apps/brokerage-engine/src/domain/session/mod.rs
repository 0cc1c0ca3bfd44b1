//! Account Session Context
//!
//! Per-account bearer-token state. Only the session manager mutates it.

mod account_session;
mod repository;

pub use account_session::{
    AD_HOC_MARGIN, AccountSession, DEFAULT_TOKEN_LIFETIME, IssuedToken, SWEEP_MARGIN, SealedToken,
};
pub use repository::AccountRepository;
