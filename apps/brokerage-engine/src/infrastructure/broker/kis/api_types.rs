//! KIS API request/response types.
//!
//! KIS encodes every number as a string and sometimes sends `""` for zero.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::portfolio::{BalanceSummary, ExecutedOrder, Holding, OpenOrder, Quote};
use crate::domain::trading::OrderSide;

// ============================================================================
// Envelope
// ============================================================================

/// Result fields common to every response. `rt_cd == "0"` means success.
///
/// Rejections carry only these fields, so they are read before the
/// operation body.
#[derive(Debug, Deserialize)]
pub struct KisResultHeader {
    /// Result code.
    #[serde(default)]
    pub rt_cd: Option<String>,
    /// Message code.
    #[serde(default)]
    pub msg_cd: Option<String>,
    /// Message.
    #[serde(default)]
    pub msg1: Option<String>,
}

/// Error body of a non-2xx response.
#[derive(Debug, Default, Deserialize)]
pub struct KisErrorBody {
    /// Gateway-level message.
    #[serde(default)]
    pub message: Option<String>,
    /// Brokerage message.
    #[serde(default)]
    pub msg1: Option<String>,
    /// Gateway-level code.
    #[serde(default)]
    pub code: Option<String>,
    /// Brokerage code.
    #[serde(default)]
    pub msg_cd: Option<String>,
    /// OAuth error text.
    #[serde(default)]
    pub error_description: Option<String>,
    /// OAuth error code.
    #[serde(default)]
    pub error_code: Option<String>,
}

impl KisErrorBody {
    /// Best available message.
    pub fn message(&self) -> Option<String> {
        self.msg1
            .clone()
            .or_else(|| self.message.clone())
            .or_else(|| self.error_description.clone())
            .filter(|m| !m.is_empty())
    }

    /// Best available code.
    pub fn code(&self) -> Option<String> {
        self.msg_cd
            .clone()
            .or_else(|| self.code.clone())
            .or_else(|| self.error_code.clone())
            .filter(|c| !c.is_empty())
    }
}

// ============================================================================
// Signing and handshake
// ============================================================================

/// `/uapi/hashkey` response.
#[derive(Debug, Deserialize)]
pub struct KisHashkeyResponse {
    /// Signature for the posted body.
    #[serde(rename = "HASH")]
    pub hash: String,
}

/// `/oauth2/Approval` request.
#[derive(Debug, Serialize)]
pub struct KisApprovalRequest<'a> {
    /// Always `client_credentials`.
    pub grant_type: &'static str,
    /// App key.
    pub appkey: &'a str,
    /// App secret (named `secretkey` here).
    pub secretkey: &'a str,
}

/// `/oauth2/Approval` response.
#[derive(Debug, Deserialize)]
pub struct KisApprovalResponse {
    /// Streaming handshake key.
    pub approval_key: String,
}

// ============================================================================
// Balance
// ============================================================================

/// `inquire-balance` body.
#[derive(Debug, Deserialize)]
pub struct KisBalanceBody {
    /// Holding lines.
    #[serde(default)]
    pub output1: Vec<KisHoldingRow>,
    /// Account totals (first row).
    #[serde(default)]
    pub output2: Vec<KisBalanceSummaryRow>,
}

/// One holding line.
#[derive(Debug, Deserialize)]
pub struct KisHoldingRow {
    /// Instrument code.
    pub pdno: String,
    /// Instrument name.
    #[serde(default)]
    pub prdt_name: String,
    /// Shares held.
    #[serde(default, deserialize_with = "de_u64")]
    pub hldg_qty: u64,
    /// Average purchase price.
    #[serde(default, deserialize_with = "de_decimal")]
    pub pchs_avg_pric: Decimal,
    /// Purchase amount.
    #[serde(default, deserialize_with = "de_decimal")]
    pub pchs_amt: Decimal,
    /// Evaluation amount.
    #[serde(default, deserialize_with = "de_decimal")]
    pub evlu_amt: Decimal,
    /// Unrealized profit or loss.
    #[serde(default, deserialize_with = "de_decimal")]
    pub evlu_pfls_amt: Decimal,
    /// Unrealized profit or loss rate.
    #[serde(default, deserialize_with = "de_decimal")]
    pub evlu_pfls_rt: Decimal,
}

impl KisHoldingRow {
    /// Convert to a domain holding without live quote fields.
    pub fn into_holding(self) -> Holding {
        Holding {
            instrument: self.pdno,
            name: self.prdt_name,
            quantity: self.hldg_qty,
            average_price: self.pchs_avg_pric,
            purchase_amount: self.pchs_amt,
            evaluation_amount: self.evlu_amt,
            profit_loss: self.evlu_pfls_amt,
            profit_loss_rate: self.evlu_pfls_rt,
            current_price: None,
            change: None,
            change_rate: None,
        }
    }
}

/// Account totals row.
#[derive(Debug, Deserialize)]
pub struct KisBalanceSummaryRow {
    /// Total evaluation.
    #[serde(default, deserialize_with = "de_decimal")]
    pub tot_evlu_amt: Decimal,
    /// Stock evaluation.
    #[serde(default, deserialize_with = "de_decimal")]
    pub scts_evlu_amt: Decimal,
    /// Deposit.
    #[serde(default, deserialize_with = "de_decimal")]
    pub dnca_tot_amt: Decimal,
    /// Total profit or loss.
    #[serde(default, deserialize_with = "de_decimal")]
    pub evlu_pfls_smtl_amt: Decimal,
    /// Total purchase amount.
    #[serde(default, deserialize_with = "de_decimal")]
    pub pchs_amt_smtl_amt: Decimal,
}

impl From<KisBalanceSummaryRow> for BalanceSummary {
    fn from(row: KisBalanceSummaryRow) -> Self {
        Self {
            total_asset: row.tot_evlu_amt,
            stock_evaluation: row.scts_evlu_amt,
            cash: row.dnca_tot_amt,
            total_profit_loss: row.evlu_pfls_smtl_amt,
            purchase_amount: row.pchs_amt_smtl_amt,
        }
    }
}

// ============================================================================
// Quote
// ============================================================================

/// `inquire-price` body.
#[derive(Debug, Deserialize)]
pub struct KisPriceBody {
    /// Quote fields.
    pub output: KisPriceOutput,
}

/// Quote fields.
#[derive(Debug, Deserialize)]
pub struct KisPriceOutput {
    /// Current price.
    #[serde(deserialize_with = "de_decimal")]
    pub stck_prpr: Decimal,
    /// Change versus previous close.
    #[serde(default, deserialize_with = "de_decimal")]
    pub prdy_vrss: Decimal,
    /// Change rate.
    #[serde(default, deserialize_with = "de_decimal")]
    pub prdy_ctrt: Decimal,
}

impl KisPriceOutput {
    /// Convert to a domain quote.
    pub fn into_quote(self, instrument: &str) -> Quote {
        Quote {
            instrument: instrument.to_string(),
            price: self.stck_prpr,
            change: self.prdy_vrss,
            change_rate: self.prdy_ctrt,
        }
    }
}

// ============================================================================
// Orders
// ============================================================================

/// `order-cash` request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct KisOrderRequest {
    /// Account number.
    pub cano: String,
    /// Product code.
    pub acnt_prdt_cd: String,
    /// Instrument code.
    pub pdno: String,
    /// Order division (`00` limit, `01` market).
    pub ord_dvsn: String,
    /// Quantity.
    pub ord_qty: String,
    /// Price (`0` for market).
    pub ord_unpr: String,
}

/// `order-rvsecncl` request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct KisRevisionRequest {
    /// Account number.
    pub cano: String,
    /// Product code.
    pub acnt_prdt_cd: String,
    /// Exchange forwarding branch (blank).
    pub krx_fwdg_ord_orgno: String,
    /// Original order number.
    pub orgn_odno: String,
    /// `01` revise, `02` cancel.
    pub rvse_cncl_dvsn_cd: String,
    /// Order division.
    pub ord_dvsn: String,
    /// Quantity.
    pub ord_qty: String,
    /// Price.
    pub ord_unpr: String,
    /// `Y` for the whole remaining quantity.
    pub qty_all_ord_yn: String,
}

/// Body of order and revision responses.
#[derive(Debug, Deserialize)]
pub struct KisOrderBody {
    /// Acknowledgement fields.
    #[serde(default)]
    pub output: Option<KisOrderOutput>,
}

/// Acknowledgement fields.
#[derive(Debug, Deserialize)]
pub struct KisOrderOutput {
    /// Order number.
    #[serde(rename = "ODNO", default)]
    pub odno: String,
    /// Order time.
    #[serde(rename = "ORD_TMD", default)]
    pub ord_tmd: Option<String>,
}

/// `inquire-psbl-rvsecncl` body.
#[derive(Debug, Deserialize)]
pub struct KisUnfilledBody {
    /// Open orders.
    #[serde(default)]
    pub output: Vec<KisUnfilledRow>,
}

/// One open order.
#[derive(Debug, Deserialize)]
pub struct KisUnfilledRow {
    /// Order number.
    pub odno: String,
    /// Original order number.
    #[serde(default)]
    pub orgn_odno: String,
    /// Instrument code.
    pub pdno: String,
    /// Instrument name.
    #[serde(default)]
    pub prdt_name: String,
    /// `01` sell, `02` buy.
    #[serde(default)]
    pub sll_buy_dvsn_cd: String,
    /// Ordered shares.
    #[serde(default, deserialize_with = "de_u64")]
    pub ord_qty: u64,
    /// Order price.
    #[serde(default, deserialize_with = "de_decimal")]
    pub ord_unpr: Decimal,
    /// Revisable shares.
    #[serde(default, deserialize_with = "de_u64")]
    pub psbl_qty: u64,
}

impl From<KisUnfilledRow> for OpenOrder {
    fn from(row: KisUnfilledRow) -> Self {
        Self {
            order_no: row.odno,
            original_order_no: Some(row.orgn_odno).filter(|o| !o.trim().is_empty()),
            instrument: row.pdno,
            name: row.prdt_name,
            side: OrderSide::from_code(&row.sll_buy_dvsn_cd),
            quantity: row.ord_qty,
            price: row.ord_unpr,
            open_quantity: row.psbl_qty,
        }
    }
}

/// `inquire-daily-ccld` body.
#[derive(Debug, Deserialize)]
pub struct KisExecutedBody {
    /// Orders with fills.
    #[serde(default)]
    pub output1: Vec<KisExecutedRow>,
}

/// One order with fills.
#[derive(Debug, Deserialize)]
pub struct KisExecutedRow {
    /// Order number.
    pub odno: String,
    /// Instrument code.
    pub pdno: String,
    /// Instrument name.
    #[serde(default)]
    pub prdt_name: String,
    /// `01` sell, `02` buy.
    #[serde(default)]
    pub sll_buy_dvsn_cd: String,
    /// Ordered shares.
    #[serde(default, deserialize_with = "de_u64")]
    pub ord_qty: u64,
    /// Filled shares.
    #[serde(default, deserialize_with = "de_u64")]
    pub tot_ccld_qty: u64,
    /// Average fill price.
    #[serde(default, deserialize_with = "de_decimal")]
    pub avg_prvs: Decimal,
    /// Order time.
    #[serde(default)]
    pub ord_tmd: String,
}

impl From<KisExecutedRow> for ExecutedOrder {
    fn from(row: KisExecutedRow) -> Self {
        Self {
            order_no: row.odno,
            instrument: row.pdno,
            name: row.prdt_name,
            side: OrderSide::from_code(&row.sll_buy_dvsn_cd),
            quantity: row.ord_qty,
            filled_quantity: row.tot_ccld_qty,
            average_price: row.avg_prvs,
            order_time: row.ord_tmd,
        }
    }
}

// ============================================================================
// String-number decoding
// ============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

impl StringOrNumber {
    fn into_text(self) -> String {
        match self {
            Self::String(s) => s.trim().to_string(),
            Self::Number(n) => n.to_string(),
        }
    }
}

fn de_decimal<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
    let text = StringOrNumber::deserialize(deserializer)?.into_text();
    if text.is_empty() {
        return Ok(Decimal::ZERO);
    }
    text.parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(serde::de::Error::custom)
}

fn de_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let text = StringOrNumber::deserialize(deserializer)?.into_text();
    if text.is_empty() {
        return Ok(0);
    }
    text.parse::<u64>().map_err(serde::de::Error::custom)
}
