//! Domain Layer
//!
//! Business rules with no infrastructure dependencies.
//!
//! # Bounded Contexts
//!
//! - [`session`]: Account session and bearer-token validity
//! - [`order_plan`]: Multi-day scheduled order plans and their progress
//! - [`trading`]: Order sides, order kinds, execution attempt records
//! - [`portfolio`]: Quotes, balances, open/filled orders, daily asset snapshots
//! - [`shared`]: Identifiers shared across contexts

pub mod order_plan;
pub mod portfolio;
pub mod session;
pub mod shared;
pub mod trading;
