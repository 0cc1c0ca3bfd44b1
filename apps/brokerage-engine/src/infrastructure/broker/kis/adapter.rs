//! KIS broker adapter implementing BrokerPort.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use chrono_tz::Tz;
use futures::StreamExt;

use super::api_types::{
    KisBalanceBody, KisExecutedBody, KisOrderBody, KisOrderRequest, KisPriceBody,
    KisRevisionRequest, KisUnfilledBody,
};
use super::config::KisConfig;
use super::error::KisError;
use super::http_client::{KisHttpClient, KisReply};
use crate::application::ports::{
    AuthorizedAccount, BrokerPort, GatewayError, RevisionRequest, TokenProvider,
};
use crate::domain::portfolio::{Balance, ExecutedOrder, OpenOrder, OrderAck, Quote};
use crate::domain::shared::AccountId;
use crate::domain::trading::{OrderSide, OrderTicket};
use crate::infrastructure::metrics;

const BALANCE_PATH: &str = "/uapi/domestic-stock/v1/trading/inquire-balance";
const PRICE_PATH: &str = "/uapi/domestic-stock/v1/quotations/inquire-price";
const ORDER_PATH: &str = "/uapi/domestic-stock/v1/trading/order-cash";
const REVISION_PATH: &str = "/uapi/domestic-stock/v1/trading/order-rvsecncl";
const UNFILLED_PATH: &str = "/uapi/domestic-stock/v1/trading/inquire-psbl-rvsecncl";
const EXECUTED_PATH: &str = "/uapi/domestic-stock/v1/trading/inquire-daily-ccld";

const TR_BALANCE: &str = "TTTC8434R";
const TR_PRICE: &str = "FHKST01010100";
const TR_BUY: &str = "TTTC0802U";
const TR_SELL: &str = "TTTC0801U";
const TR_REVISION: &str = "TTTC0803U";
const TR_UNFILLED: &str = "TTTC0084R";
const TR_EXECUTED: &str = "TTTC8001R";

/// Concurrent quote lookups while enriching a balance.
const ENRICHMENT_CONCURRENCY: usize = 10;

/// KIS broker adapter.
///
/// Stateless apart from pacing; every call asks the token provider for a
/// usable session first.
#[derive(Clone)]
pub struct KisBrokerAdapter {
    client: KisHttpClient,
    sessions: Arc<dyn TokenProvider>,
    timezone: Tz,
}

impl KisBrokerAdapter {
    /// Create a new KIS broker adapter.
    pub fn new(config: &KisConfig, sessions: Arc<dyn TokenProvider>) -> Result<Self, KisError> {
        Ok(Self {
            client: KisHttpClient::new(config)?,
            sessions,
            timezone: config.timezone,
        })
    }

    async fn authorize(&self, account: &AccountId) -> Result<AuthorizedAccount, KisError> {
        Ok(self.sessions.authorize(account).await?)
    }

    async fn fetch_quote(
        &self,
        auth: &AuthorizedAccount,
        instrument: &str,
    ) -> Result<Quote, KisError> {
        let body: KisPriceBody = self
            .client
            .get(
                PRICE_PATH,
                TR_PRICE,
                auth,
                &[("FID_COND_MRKT_DIV_CODE", "J"), ("FID_INPUT_ISCD", instrument)],
            )
            .await?;
        Ok(body.output.into_quote(instrument))
    }

    async fn balance(&self, account: &AccountId) -> Result<Balance, KisError> {
        let auth = self.authorize(account).await?;
        let creds = &auth.credentials;

        let body: KisBalanceBody = self
            .client
            .get(
                BALANCE_PATH,
                TR_BALANCE,
                &auth,
                &[
                    ("CANO", creds.account_number.as_str()),
                    ("ACNT_PRDT_CD", creds.product_code.as_str()),
                    ("AFHR_FLPR_YN", "N"),
                    ("OFL_YN", "N"),
                    ("INQR_DVSN", "02"),
                    ("UNPR_DVSN", "01"),
                    ("FUND_STTL_ICLD_YN", "N"),
                    ("FNCG_AMT_AUTO_RDPT_YN", "N"),
                    ("PRCS_DVSN", "00"),
                    ("CTX_AREA_FK100", ""),
                    ("CTX_AREA_NK100", ""),
                ],
            )
            .await?;

        let summary = body.output2.into_iter().next().map(Into::into);
        let holdings = futures::stream::iter(body.output1.into_iter().map(|row| row.into_holding()))
            .map(|mut holding| {
                let auth = &auth;
                async move {
                    match self.fetch_quote(auth, &holding.instrument).await {
                        Ok(quote) => holding.enrich(&quote),
                        Err(e) => tracing::warn!(
                            account_id = %account,
                            instrument = %holding.instrument,
                            error = %e,
                            "Quote enrichment failed"
                        ),
                    }
                    holding
                }
            })
            .buffered(ENRICHMENT_CONCURRENCY)
            .collect()
            .await;

        Ok(Balance { holdings, summary })
    }

    async fn order(&self, account: &AccountId, ticket: &OrderTicket) -> Result<OrderAck, KisError> {
        let auth = self.authorize(account).await?;
        let tr_id = match ticket.side {
            OrderSide::Buy => TR_BUY,
            OrderSide::Sell => TR_SELL,
        };
        let request = KisOrderRequest {
            cano: auth.credentials.account_number.clone(),
            acnt_prdt_cd: auth.credentials.product_code.clone(),
            pdno: ticket.instrument.clone(),
            ord_dvsn: ticket.kind.code().to_string(),
            ord_qty: ticket.quantity.to_string(),
            ord_unpr: ticket.wire_price().to_string(),
        };

        tracing::info!(
            account_id = %account,
            instrument = %ticket.instrument,
            side = %ticket.side,
            quantity = ticket.quantity,
            price = %request.ord_unpr,
            ord_dvsn = %request.ord_dvsn,
            "Submitting order to KIS"
        );

        let reply: KisReply<KisOrderBody> =
            self.client.post(ORDER_PATH, tr_id, &auth, &request).await?;
        Ok(ack_from(reply))
    }

    async fn revision(
        &self,
        account: &AccountId,
        revision: &RevisionRequest,
    ) -> Result<OrderAck, KisError> {
        let auth = self.authorize(account).await?;
        let (quantity, price) = revision.wire_quantity_and_price();
        let request = KisRevisionRequest {
            cano: auth.credentials.account_number.clone(),
            acnt_prdt_cd: auth.credentials.product_code.clone(),
            krx_fwdg_ord_orgno: " ".to_string(),
            orgn_odno: revision.original_order_no.clone(),
            rvse_cncl_dvsn_cd: revision.kind.code().to_string(),
            ord_dvsn: revision.order_kind.code().to_string(),
            ord_qty: quantity.to_string(),
            ord_unpr: price.to_string(),
            qty_all_ord_yn: if revision.all { "Y" } else { "N" }.to_string(),
        };

        let reply: KisReply<KisOrderBody> = self
            .client
            .post(REVISION_PATH, TR_REVISION, &auth, &request)
            .await?;
        Ok(ack_from(reply))
    }

    async fn unfilled(&self, account: &AccountId) -> Result<Vec<OpenOrder>, KisError> {
        let auth = self.authorize(account).await?;
        let creds = &auth.credentials;
        let body: KisUnfilledBody = self
            .client
            .get(
                UNFILLED_PATH,
                TR_UNFILLED,
                &auth,
                &[
                    ("CANO", creds.account_number.as_str()),
                    ("ACNT_PRDT_CD", creds.product_code.as_str()),
                    ("CTX_AREA_FK100", ""),
                    ("CTX_AREA_NK100", ""),
                    ("INQR_DVSN_1", "1"),
                    ("INQR_DVSN_2", "0"),
                ],
            )
            .await?;
        Ok(body.output.into_iter().map(Into::into).collect())
    }

    async fn executed(&self, account: &AccountId) -> Result<Vec<ExecutedOrder>, KisError> {
        let auth = self.authorize(account).await?;
        let creds = &auth.credentials;
        let today = Utc::now()
            .with_timezone(&self.timezone)
            .format("%Y%m%d")
            .to_string();
        let body: KisExecutedBody = self
            .client
            .get(
                EXECUTED_PATH,
                TR_EXECUTED,
                &auth,
                &[
                    ("CANO", creds.account_number.as_str()),
                    ("ACNT_PRDT_CD", creds.product_code.as_str()),
                    ("INQR_STRT_DT", today.as_str()),
                    ("INQR_END_DT", today.as_str()),
                    ("SLL_BUY_DVSN_CD", "00"),
                    ("INQR_DVSN", "00"),
                    ("PDNO", ""),
                    ("CCLD_DVSN", "01"),
                    ("ORD_GNO_BRNO", ""),
                    ("ODNO", ""),
                    ("INQR_DVSN_3", "00"),
                    ("INQR_DVSN_1", ""),
                    ("CTX_AREA_FK100", ""),
                    ("CTX_AREA_NK100", ""),
                ],
            )
            .await?;
        Ok(body.output1.into_iter().map(Into::into).collect())
    }
}

fn ack_from(reply: KisReply<KisOrderBody>) -> OrderAck {
    let output = reply.body.output;
    OrderAck {
        order_no: output.as_ref().map(|o| o.odno.clone()).unwrap_or_default(),
        order_time: output.and_then(|o| o.ord_tmd),
        message: reply.message,
    }
}

/// Record the outcome of one operation and convert its error.
fn observe<T>(operation: &'static str, result: Result<T, KisError>) -> Result<T, GatewayError> {
    metrics::record_gateway_request(operation, result.is_ok());
    result.map_err(|e| {
        tracing::warn!(operation, error = %e, "KIS request failed");
        GatewayError::from(e)
    })
}

#[async_trait]
impl BrokerPort for KisBrokerAdapter {
    async fn get_balance(&self, account: &AccountId) -> Result<Balance, GatewayError> {
        observe("get_balance", self.balance(account).await)
    }

    async fn get_quote(
        &self,
        account: &AccountId,
        instrument: &str,
    ) -> Result<Quote, GatewayError> {
        let result = match self.authorize(account).await {
            Ok(auth) => self.fetch_quote(&auth, instrument).await,
            Err(e) => Err(e),
        };
        observe("get_quote", result)
    }

    async fn place_order(
        &self,
        account: &AccountId,
        ticket: &OrderTicket,
    ) -> Result<OrderAck, GatewayError> {
        observe("place_order", self.order(account, ticket).await)
    }

    async fn revise_or_cancel_order(
        &self,
        account: &AccountId,
        request: &RevisionRequest,
    ) -> Result<OrderAck, GatewayError> {
        observe("revise_or_cancel_order", self.revision(account, request).await)
    }

    async fn get_unfilled_orders(
        &self,
        account: &AccountId,
    ) -> Result<Vec<OpenOrder>, GatewayError> {
        observe("get_unfilled_orders", self.unfilled(account).await)
    }

    async fn get_executed_orders(
        &self,
        account: &AccountId,
    ) -> Result<Vec<ExecutedOrder>, GatewayError> {
        observe("get_executed_orders", self.executed(account).await)
    }

    async fn get_approval_key(&self, account: &AccountId) -> Result<String, GatewayError> {
        let result = match self.sessions.credentials(account).await {
            Ok(credentials) => self.client.approval_key(&credentials).await,
            Err(e) => Err(KisError::from(e)),
        };
        observe("get_approval_key", result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::api_types::KisOrderOutput;

    #[test]
    fn ack_without_output_has_empty_order_no() {
        let ack = ack_from(KisReply {
            body: KisOrderBody { output: None },
            message: "ok".to_string(),
        });
        assert!(ack.order_no.is_empty());
        assert!(ack.order_time.is_none());
        assert_eq!(ack.message, "ok");
    }

    #[test]
    fn ack_copies_order_number_and_time() {
        let ack = ack_from(KisReply {
            body: KisOrderBody {
                output: Some(KisOrderOutput {
                    odno: "0000117057".to_string(),
                    ord_tmd: Some("121052".to_string()),
                }),
            },
            message: "주문 전송 완료 되었습니다.".to_string(),
        });
        assert_eq!(ack.order_no, "0000117057");
        assert_eq!(ack.order_time.as_deref(), Some("121052"));
    }
}
