//! Manual Trading Use Case
//!
//! Ad-hoc account queries and order requests. Failures propagate to the
//! caller with the brokerage's own message and code.

use std::sync::Arc;

use crate::application::dto::PlaceOrderDto;
use crate::application::ports::{BrokerPort, GatewayError, RevisionRequest};
use crate::domain::portfolio::{Balance, ExecutedOrder, OpenOrder, OrderAck, Quote};
use crate::domain::shared::{AccountId, RepositoryError};
use crate::domain::trading::{AttemptSource, ExecutionAttempt, ExecutionLog};

/// Default page size of the trade log.
pub const DEFAULT_TRADE_LOG_LIMIT: usize = 100;

/// Use case for manual trading.
pub struct ManualTradingUseCase<B, L>
where
    B: BrokerPort,
    L: ExecutionLog,
{
    broker: Arc<B>,
    log: Arc<L>,
}

impl<B, L> ManualTradingUseCase<B, L>
where
    B: BrokerPort,
    L: ExecutionLog,
{
    /// Create a new ManualTradingUseCase.
    pub const fn new(broker: Arc<B>, log: Arc<L>) -> Self {
        Self { broker, log }
    }

    /// Holdings and totals.
    ///
    /// # Errors
    ///
    /// Returns the gateway failure.
    pub async fn balance(&self, account: &AccountId) -> Result<Balance, GatewayError> {
        self.broker.get_balance(account).await
    }

    /// Quote of one instrument.
    ///
    /// # Errors
    ///
    /// Returns the gateway failure.
    pub async fn quote(&self, account: &AccountId, instrument: &str) -> Result<Quote, GatewayError> {
        self.broker.get_quote(account, instrument).await
    }

    /// Place an order and record the attempt as `manual`.
    ///
    /// # Errors
    ///
    /// Returns the gateway failure after recording a FAILED attempt.
    pub async fn place_order(
        &self,
        account: &AccountId,
        request: &PlaceOrderDto,
    ) -> Result<OrderAck, GatewayError> {
        let ticket = request.to_ticket();
        let result = self.broker.place_order(account, &ticket).await;

        let attempt = match &result {
            Ok(ack) => {
                tracing::info!(
                    account_id = %account,
                    instrument = %ticket.instrument,
                    side = %ticket.side,
                    quantity = ticket.quantity,
                    order_no = %ack.order_no,
                    "Manual order accepted"
                );
                ExecutionAttempt::success(AttemptSource::Manual, account.clone(), &ticket, &ack.message)
            }
            Err(e) => {
                tracing::warn!(
                    account_id = %account,
                    instrument = %ticket.instrument,
                    error = %e,
                    "Manual order rejected"
                );
                ExecutionAttempt::failed(
                    AttemptSource::Manual,
                    account.clone(),
                    &ticket,
                    e.broker_message(),
                )
            }
        };
        if let Err(e) = self.log.append(attempt).await {
            tracing::error!(error = %e, "Failed to append manual attempt");
        }

        result
    }

    /// Revise or cancel an open order.
    ///
    /// # Errors
    ///
    /// Returns the gateway failure.
    pub async fn revise_or_cancel(
        &self,
        account: &AccountId,
        request: &RevisionRequest,
    ) -> Result<OrderAck, GatewayError> {
        let ack = self.broker.revise_or_cancel_order(account, request).await?;
        tracing::info!(
            account_id = %account,
            original_order_no = %request.original_order_no,
            kind = ?request.kind,
            order_no = %ack.order_no,
            "Order revision accepted"
        );
        Ok(ack)
    }

    /// Orders still open.
    ///
    /// # Errors
    ///
    /// Returns the gateway failure.
    pub async fn unfilled_orders(&self, account: &AccountId) -> Result<Vec<OpenOrder>, GatewayError> {
        self.broker.get_unfilled_orders(account).await
    }

    /// Today's filled orders.
    ///
    /// # Errors
    ///
    /// Returns the gateway failure.
    pub async fn executed_orders(
        &self,
        account: &AccountId,
    ) -> Result<Vec<ExecutedOrder>, GatewayError> {
        self.broker.get_executed_orders(account).await
    }

    /// Attempt records newest first.
    ///
    /// # Errors
    ///
    /// Returns the storage failure.
    pub async fn trade_log(
        &self,
        skip: usize,
        limit: Option<usize>,
    ) -> Result<Vec<ExecutionAttempt>, RepositoryError> {
        self.log
            .page(skip, limit.unwrap_or(DEFAULT_TRADE_LOG_LIMIT))
            .await
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::application::ports::MockBrokerPort;
    use crate::domain::trading::{AttemptOutcome, OrderKind, OrderSide};
    use crate::infrastructure::persistence::InMemoryExecutionLog;

    fn order() -> PlaceOrderDto {
        PlaceOrderDto {
            instrument: "005930".to_string(),
            side: OrderSide::Buy,
            quantity: 2,
            price: dec!(70000),
            kind: OrderKind::Limit,
        }
    }

    #[tokio::test]
    async fn rejected_manual_order_is_logged_and_returned() {
        let mut broker = MockBrokerPort::new();
        broker.expect_place_order().returning(|_, _| {
            Err(GatewayError::BrokerRequestFailed {
                status: None,
                code: "APBK0919".to_string(),
                message: "주문가능금액을 초과 했습니다".to_string(),
            })
        });
        let log = Arc::new(InMemoryExecutionLog::new());
        let use_case = ManualTradingUseCase::new(Arc::new(broker), Arc::clone(&log));

        let err = use_case
            .place_order(&AccountId::from("acct"), &order())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::BrokerRequestFailed { .. }));

        let records = use_case.trade_log(0, None).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source, AttemptSource::Manual);
        assert_eq!(records[0].outcome, AttemptOutcome::Failed);
        assert_eq!(records[0].message, "주문가능금액을 초과 했습니다");
    }

    #[tokio::test]
    async fn accepted_manual_order_is_logged_as_success() {
        let mut broker = MockBrokerPort::new();
        broker.expect_place_order().returning(|_, _| {
            Ok(OrderAck {
                order_no: "1".to_string(),
                order_time: None,
                message: "ok".to_string(),
            })
        });
        let log = Arc::new(InMemoryExecutionLog::new());
        let use_case = ManualTradingUseCase::new(Arc::new(broker), Arc::clone(&log));

        use_case
            .place_order(&AccountId::from("acct"), &order())
            .await
            .unwrap();
        assert!(log.page(0, 1).await.unwrap()[0].is_success());
    }
}
