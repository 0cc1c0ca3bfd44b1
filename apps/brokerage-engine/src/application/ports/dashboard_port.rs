//! Dashboard Port (Driven Port)
//!
//! External reporting target for end-of-day asset snapshots.

use async_trait::async_trait;

use crate::domain::portfolio::DailyAssetSnapshot;

/// Dashboard publish failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DashboardError {
    /// Target rejected or could not be reached.
    #[error("dashboard publish failed: {message}")]
    PublishFailed {
        /// Failure detail.
        message: String,
    },
}

/// Receives the day's snapshots.
#[async_trait]
pub trait DashboardSink: Send + Sync {
    /// Publish snapshots for one day.
    async fn publish(&self, snapshots: &[DailyAssetSnapshot]) -> Result<(), DashboardError>;
}

/// Sink that only logs.
#[derive(Debug, Clone, Default)]
pub struct LoggingDashboardSink;

#[async_trait]
impl DashboardSink for LoggingDashboardSink {
    async fn publish(&self, snapshots: &[DailyAssetSnapshot]) -> Result<(), DashboardError> {
        for snapshot in snapshots {
            tracing::info!(
                account_id = %snapshot.account_id,
                date = %snapshot.date,
                total_asset = %snapshot.total_asset,
                daily_profit_loss = %snapshot.daily_profit_loss,
                "Dashboard snapshot"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn logging_sink_accepts_empty_batch() {
        assert!(LoggingDashboardSink.publish(&[]).await.is_ok());
    }
}
