//! Portfolio Context
//!
//! Read models returned by the brokerage and the daily asset history.

mod balance;
mod orders;
mod repository;
mod snapshot;

pub use balance::{Balance, BalanceSummary, Holding, Quote};
pub use orders::{ExecutedOrder, OpenOrder, OrderAck};
pub use repository::AssetHistoryRepository;
pub use snapshot::DailyAssetSnapshot;
