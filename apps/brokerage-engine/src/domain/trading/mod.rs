//! Trading Context
//!
//! Order vocabulary and the append-only execution attempt log.

mod attempt;
mod order_kind;
mod order_side;
mod repository;
mod ticket;

pub use attempt::{AttemptOutcome, AttemptSource, ExecutionAttempt};
pub use order_kind::{OrderKind, RevisionKind};
pub use order_side::OrderSide;
pub use repository::ExecutionLog;
pub use ticket::OrderTicket;
