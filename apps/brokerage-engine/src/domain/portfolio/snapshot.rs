//! End-of-day asset snapshot.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::BalanceSummary;
use crate::domain::shared::AccountId;

/// One account's totals at the end of one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyAssetSnapshot {
    /// Account.
    pub account_id: AccountId,
    /// Local trading date.
    pub date: NaiveDate,
    /// Total evaluation.
    pub total_asset: Decimal,
    /// Stock evaluation.
    pub stock_evaluation: Decimal,
    /// Deposit.
    pub cash: Decimal,
    /// Cumulative unrealized profit or loss.
    pub total_profit_loss: Decimal,
    /// Cumulative rate versus purchase amount, percent, 2dp.
    pub total_profit_loss_rate: Decimal,
    /// Change of cumulative profit or loss since the previous snapshot.
    pub daily_profit_loss: Decimal,
    /// Daily change versus the previous total asset, percent, 2dp.
    pub daily_profit_loss_rate: Decimal,
    /// When recorded.
    pub recorded_at: DateTime<Utc>,
}

impl DailyAssetSnapshot {
    /// Build a snapshot from today's summary and the latest earlier snapshot.
    #[must_use]
    pub fn from_summary(
        account_id: AccountId,
        date: NaiveDate,
        summary: &BalanceSummary,
        previous: Option<&Self>,
    ) -> Self {
        let total_profit_loss_rate = percent_of(summary.total_profit_loss, summary.purchase_amount);

        let (daily_profit_loss, daily_profit_loss_rate) = previous.map_or(
            (Decimal::ZERO, Decimal::ZERO),
            |prev| {
                let daily = summary.total_profit_loss - prev.total_profit_loss;
                (daily, percent_of(daily, prev.total_asset))
            },
        );

        Self {
            account_id,
            date,
            total_asset: summary.total_asset,
            stock_evaluation: summary.stock_evaluation,
            cash: summary.cash,
            total_profit_loss: summary.total_profit_loss,
            total_profit_loss_rate,
            daily_profit_loss,
            daily_profit_loss_rate,
            recorded_at: Utc::now(),
        }
    }
}

fn percent_of(part: Decimal, whole: Decimal) -> Decimal {
    if whole <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (part / whole * Decimal::ONE_HUNDRED).round_dp(2)
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn summary(total_asset: Decimal, pl: Decimal, purchase: Decimal) -> BalanceSummary {
        BalanceSummary {
            total_asset,
            stock_evaluation: total_asset - dec!(100000),
            cash: dec!(100000),
            total_profit_loss: pl,
            purchase_amount: purchase,
        }
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, day).unwrap()
    }

    #[test]
    fn first_snapshot_has_no_daily_change() {
        let snap = DailyAssetSnapshot::from_summary(
            AccountId::from("a"),
            date(5),
            &summary(dec!(10000000), dec!(300000), dec!(9000000)),
            None,
        );
        assert_eq!(snap.total_profit_loss_rate, dec!(3.33));
        assert_eq!(snap.daily_profit_loss, Decimal::ZERO);
        assert_eq!(snap.daily_profit_loss_rate, Decimal::ZERO);
    }

    #[test]
    fn daily_change_against_previous() {
        let prev = DailyAssetSnapshot::from_summary(
            AccountId::from("a"),
            date(5),
            &summary(dec!(10000000), dec!(300000), dec!(9000000)),
            None,
        );
        let snap = DailyAssetSnapshot::from_summary(
            AccountId::from("a"),
            date(6),
            &summary(dec!(10150000), dec!(450000), dec!(9000000)),
            Some(&prev),
        );
        assert_eq!(snap.daily_profit_loss, dec!(150000));
        assert_eq!(snap.daily_profit_loss_rate, dec!(1.50));
    }

    #[test]
    fn zero_purchase_amount_yields_zero_rate() {
        let snap = DailyAssetSnapshot::from_summary(
            AccountId::from("a"),
            date(5),
            &summary(dec!(100000), dec!(0), dec!(0)),
            None,
        );
        assert_eq!(snap.total_profit_loss_rate, Decimal::ZERO);
    }
}
