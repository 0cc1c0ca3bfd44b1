//! HTTP request DTOs.

use serde::Deserialize;

/// `GET /v1/plans` query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlanListQuery {
    /// Restrict to one account.
    pub account_id: Option<String>,
}

/// `GET /v1/logs` query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TradeLogQuery {
    /// Records to skip, newest first.
    #[serde(default)]
    pub skip: usize,
    /// Page size.
    pub limit: Option<usize>,
}

/// `POST /v1/ws/subscribe` body.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscribeRequest {
    /// Instrument codes.
    pub codes: Vec<String>,
}

/// Pseudo-instrument used for cash lines.
const CASH_CODE: &str = "CASH";

impl SubscribeRequest {
    /// Split codes into those worth subscribing and those to ignore.
    #[must_use]
    pub fn partition(&self) -> (Vec<String>, Vec<String>) {
        let mut subscribe = Vec::new();
        let mut skipped = Vec::new();
        for code in &self.codes {
            let trimmed = code.trim();
            if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(CASH_CODE) {
                skipped.push(code.clone());
            } else if !subscribe.iter().any(|c: &String| c == trimmed) {
                subscribe.push(trimmed.to_string());
            }
        }
        (subscribe, skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cash_and_blank_codes_are_skipped() {
        let request = SubscribeRequest {
            codes: vec![
                "005930".to_string(),
                "CASH".to_string(),
                " ".to_string(),
                "005930".to_string(),
                "000660".to_string(),
            ],
        };
        let (subscribe, skipped) = request.partition();
        assert_eq!(subscribe, ["005930", "000660"]);
        assert_eq!(skipped, ["CASH", " "]);
    }
}
