//! Scheduled Order Plan Context
//!
//! A plan commits to buying or selling a total quantity (or currency amount)
//! of one instrument in per-cycle slices over several days.
//!
//! # Lifecycle
//!
//! ```text
//! ACTIVE ──► COMPLETED
//!    └─────► CANCELLED
//! ```
//!
//! Terminal states never change again.

mod errors;
mod plan;
mod repository;
mod status;
mod target;

pub use errors::PlanError;
pub use plan::ScheduledOrderPlan;
pub use repository::PlanRepository;
pub use status::PlanStatus;
pub use target::{FulfillmentMode, PlanTarget};
