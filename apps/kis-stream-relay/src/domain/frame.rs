//! Inbound Frame Decoding
//!
//! The KIS real-time endpoint sends two kinds of text frames:
//!
//! - **Control frames**: JSON objects (subscription acks, `PINGPONG` keepalives).
//! - **Data frames**: `flag|feed_type|count|payload`, where `flag` is `0`
//!   (plain) or `1` (encrypted) and `payload` is `^`-separated positional fields.
//!
//! ```text
//! 0|H0STCNT0|001|005930^093015^71500^2^500^0.70^...
//! ```

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;

/// Execution-notice feed code.
pub const EXECUTION_NOTICE_FEED: &str = "H0STCNI0";

/// Real-time trade price feed code.
pub const PRICE_FEED: &str = "H0STCNT0";

/// Minimum number of positional fields in a price payload.
const PRICE_MIN_FIELDS: usize = 11;

// =============================================================================
// Errors
// =============================================================================

/// Errors decoding a single inbound frame. Never fatal to the read loop.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameDecodeError {
    /// Frame had no content.
    #[error("empty frame")]
    Empty,

    /// Data frame did not have the four pipe-delimited sections.
    #[error("malformed data frame: expected 4 sections, got {sections}")]
    MalformedDataFrame {
        /// Number of sections found.
        sections: usize,
    },

    /// Record count section was not a number.
    #[error("invalid record count: {0}")]
    InvalidCount(String),

    /// Control frame was not valid JSON.
    #[error("invalid control frame: {0}")]
    InvalidJson(String),

    /// Payload had fewer positional fields than the feed requires.
    #[error("{feed_type} payload too short: {actual} fields")]
    PayloadTooShort {
        /// Feed code of the frame.
        feed_type: String,
        /// Fields present.
        actual: usize,
    },

    /// A numeric payload field could not be parsed.
    #[error("invalid {field}: {value}")]
    InvalidNumber {
        /// Field name.
        field: &'static str,
        /// Raw value.
        value: String,
    },
}

// =============================================================================
// Frames
// =============================================================================

/// A decoded data frame, borrowing from the raw text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataFrame<'a> {
    /// Whether the payload is encrypted (`1`).
    pub encrypted: bool,
    /// Feed code, e.g. `H0STCNT0`.
    pub feed_type: &'a str,
    /// Number of records in the payload.
    pub count: u32,
    /// Raw `^`-separated payload.
    pub payload: &'a str,
}

/// Any inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame<'a> {
    /// JSON control frame (ack, keepalive).
    Control(serde_json::Value),
    /// Positional data frame.
    Data(DataFrame<'a>),
}

impl InboundFrame<'_> {
    /// Whether this is a `PINGPONG` keepalive that must be echoed back.
    #[must_use]
    pub fn is_keepalive(&self) -> bool {
        match self {
            Self::Control(value) => {
                value.pointer("/header/tr_id").and_then(|v| v.as_str()) == Some("PINGPONG")
            }
            Self::Data(_) => false,
        }
    }
}

/// Split a raw text frame into control or data form.
///
/// # Errors
///
/// Returns `FrameDecodeError` when the frame is empty, a data frame has
/// fewer than four sections, or a control frame is not JSON.
pub fn decode_frame(text: &str) -> Result<InboundFrame<'_>, FrameDecodeError> {
    let Some(first) = text.chars().next() else {
        return Err(FrameDecodeError::Empty);
    };

    if first != '0' && first != '1' {
        return serde_json::from_str(text)
            .map(InboundFrame::Control)
            .map_err(|e| FrameDecodeError::InvalidJson(e.to_string()));
    }

    let sections: Vec<&str> = text.splitn(4, '|').collect();
    if sections.len() < 4 {
        return Err(FrameDecodeError::MalformedDataFrame {
            sections: sections.len(),
        });
    }

    let count = sections[2]
        .trim()
        .parse::<u32>()
        .map_err(|_| FrameDecodeError::InvalidCount(sections[2].to_string()))?;

    Ok(InboundFrame::Data(DataFrame {
        encrypted: sections[0] == "1",
        feed_type: sections[1],
        count,
        payload: sections[3],
    }))
}

// =============================================================================
// Events
// =============================================================================

/// Event pushed to downstream subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelayEvent {
    /// An order of the subscribed account changed; re-fetch order state.
    Execution,
    /// Trade price tick.
    Price {
        /// Instrument code.
        code: String,
        /// Current price.
        price: Decimal,
        /// Change versus previous close.
        change: Decimal,
        /// Change rate in percent.
        rate: Decimal,
    },
}

/// Decode a data frame into a relay event.
///
/// Returns `Ok(None)` for feed types this relay does not handle.
/// Only the first record of a multi-record price frame is decoded.
///
/// # Errors
///
/// Returns `FrameDecodeError` if a price payload is short or non-numeric.
pub fn decode_event(frame: &DataFrame<'_>) -> Result<Option<RelayEvent>, FrameDecodeError> {
    match frame.feed_type {
        // Payload is encrypted and authoritative state is re-fetched anyway.
        EXECUTION_NOTICE_FEED => Ok(Some(RelayEvent::Execution)),
        PRICE_FEED => decode_price(frame.payload).map(Some),
        _ => Ok(None),
    }
}

fn decode_price(payload: &str) -> Result<RelayEvent, FrameDecodeError> {
    let fields: Vec<&str> = payload.split('^').collect();
    if fields.len() < PRICE_MIN_FIELDS {
        return Err(FrameDecodeError::PayloadTooShort {
            feed_type: PRICE_FEED.to_string(),
            actual: fields.len(),
        });
    }

    Ok(RelayEvent::Price {
        code: fields[0].to_string(),
        price: parse_decimal("price", fields[2])?,
        change: parse_decimal("change", fields[4])?,
        rate: parse_decimal("rate", fields[5])?,
    })
}

fn parse_decimal(field: &'static str, value: &str) -> Result<Decimal, FrameDecodeError> {
    Decimal::from_str(value.trim()).map_err(|_| FrameDecodeError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use test_case::test_case;

    use super::*;

    const PRICE_FRAME: &str =
        "0|H0STCNT0|001|005930^093015^71500^2^500^0.70^71200.50^71000^72000^70800^71500^71400";

    #[test]
    fn decodes_price_frame() {
        let InboundFrame::Data(frame) = decode_frame(PRICE_FRAME).unwrap() else {
            panic!("expected data frame");
        };
        assert!(!frame.encrypted);
        assert_eq!(frame.feed_type, PRICE_FEED);
        assert_eq!(frame.count, 1);

        let event = decode_event(&frame).unwrap();
        assert_eq!(
            event,
            Some(RelayEvent::Price {
                code: "005930".to_string(),
                price: dec!(71500),
                change: dec!(500),
                rate: dec!(0.70),
            })
        );
    }

    #[test]
    fn execution_notice_payload_is_not_decoded() {
        let text = "1|H0STCNI0|001|c2VjcmV0LWVuY3J5cHRlZC1wYXlsb2Fk";
        let InboundFrame::Data(frame) = decode_frame(text).unwrap() else {
            panic!("expected data frame");
        };
        assert!(frame.encrypted);
        assert_eq!(decode_event(&frame).unwrap(), Some(RelayEvent::Execution));
    }

    #[test]
    fn unknown_feed_type_yields_no_event() {
        let InboundFrame::Data(frame) = decode_frame("0|H0STASP0|001|005930^1^2").unwrap() else {
            panic!("expected data frame");
        };
        assert_eq!(decode_event(&frame).unwrap(), None);
    }

    #[test_case("" => FrameDecodeError::Empty ; "empty")]
    #[test_case("0|H0STCNT0|001" => FrameDecodeError::MalformedDataFrame { sections: 3 } ; "missing payload")]
    #[test_case("0|H0STCNT0|x|a^b" => FrameDecodeError::InvalidCount("x".to_string()) ; "bad count")]
    fn rejects_malformed_frames(text: &str) -> FrameDecodeError {
        decode_frame(text).unwrap_err()
    }

    #[test]
    fn rejects_non_json_control_frame() {
        assert!(matches!(
            decode_frame("hello"),
            Err(FrameDecodeError::InvalidJson(_))
        ));
    }

    #[test_case("005930^093015^71500^2^500" => 5 ; "five fields")]
    #[test_case("005930^093015^71500^2^500^0.70^1^2^3^4" => 10 ; "ten fields")]
    fn short_price_payload_is_rejected(payload: &str) -> usize {
        let frame = DataFrame {
            encrypted: false,
            feed_type: PRICE_FEED,
            count: 1,
            payload,
        };
        match decode_event(&frame) {
            Err(FrameDecodeError::PayloadTooShort { actual, .. }) => actual,
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn non_numeric_price_is_rejected() {
        let frame = DataFrame {
            encrypted: false,
            feed_type: PRICE_FEED,
            count: 1,
            payload: "005930^093015^N/A^2^500^0.70^1^2^3^4^5",
        };
        assert_eq!(
            decode_event(&frame),
            Err(FrameDecodeError::InvalidNumber {
                field: "price",
                value: "N/A".to_string(),
            })
        );
    }

    #[test]
    fn detects_keepalive() {
        let frame = decode_frame(r#"{"header":{"tr_id":"PINGPONG","datetime":"20260105093000"}}"#)
            .unwrap();
        assert!(frame.is_keepalive());

        let ack = decode_frame(
            r#"{"header":{"tr_id":"H0STCNT0","tr_key":"005930"},"body":{"rt_cd":"0","msg1":"SUBSCRIBE SUCCESS"}}"#,
        )
        .unwrap();
        assert!(!ack.is_keepalive());
    }

    #[test]
    fn price_event_serializes_with_type_tag() {
        let event = RelayEvent::Price {
            code: "005930".to_string(),
            price: dec!(71500),
            change: dec!(-500),
            rate: dec!(-0.69),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "PRICE");
        assert_eq!(json["code"], "005930");
        assert_eq!(json["price"], "71500");
        assert_eq!(json["rate"], "-0.69");

        let json = serde_json::to_value(RelayEvent::Execution).unwrap();
        assert_eq!(json, serde_json::json!({"type": "EXECUTION"}));
    }
}
