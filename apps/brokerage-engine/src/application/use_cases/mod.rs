//! Application Use Cases
//!
//! Use cases orchestrate domain logic to fulfill application requirements.

mod execute_scheduled_orders;
mod manage_plans;
mod manual_trading;
mod record_assets;

pub use execute_scheduled_orders::{CycleReport, ExecuteScheduledOrdersUseCase};
pub use manage_plans::ManagePlansUseCase;
pub use manual_trading::{DEFAULT_TRADE_LOG_LIMIT, ManualTradingUseCase};
pub use record_assets::{
    AssetReport, DashboardSyncError, RecordAssetsUseCase, SyncDashboardUseCase,
};
