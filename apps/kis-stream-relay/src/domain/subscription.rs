//! Subscription registration frames.

use serde::Serialize;

use super::frame::{EXECUTION_NOTICE_FEED, PRICE_FEED};

/// Feeds the relay can register for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedKind {
    /// Order execution notices, keyed by the account's HTS id.
    ExecutionNotice,
    /// Trade price ticks, keyed by instrument code.
    Price,
}

impl FeedKind {
    /// Feed code sent as `tr_id`.
    #[must_use]
    pub const fn tr_id(self) -> &'static str {
        match self {
            Self::ExecutionNotice => EXECUTION_NOTICE_FEED,
            Self::Price => PRICE_FEED,
        }
    }
}

/// Registration frame sent upstream.
#[derive(Debug, Clone, Serialize)]
pub struct SubscribeRequest<'a> {
    header: Header<'a>,
    body: Body<'a>,
}

#[derive(Debug, Clone, Serialize)]
struct Header<'a> {
    approval_key: &'a str,
    custtype: &'a str,
    /// `1` registers, `2` releases.
    tr_type: &'static str,
    #[serde(rename = "content-type")]
    content_type: &'static str,
}

#[derive(Debug, Clone, Serialize)]
struct Body<'a> {
    input: Input<'a>,
}

#[derive(Debug, Clone, Serialize)]
struct Input<'a> {
    tr_id: &'static str,
    tr_key: &'a str,
}

impl<'a> SubscribeRequest<'a> {
    /// Build a registration frame for `key` on `feed`.
    #[must_use]
    pub const fn register(
        approval_key: &'a str,
        customer_type: &'a str,
        feed: FeedKind,
        key: &'a str,
    ) -> Self {
        Self {
            header: Header {
                approval_key,
                custtype: customer_type,
                tr_type: "1",
                content_type: "utf-8",
            },
            body: Body {
                input: Input {
                    tr_id: feed.tr_id(),
                    tr_key: key,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_frame_layout() {
        let request = SubscribeRequest::register("approval-123", "P", FeedKind::Price, "005930");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "header": {
                    "approval_key": "approval-123",
                    "custtype": "P",
                    "tr_type": "1",
                    "content-type": "utf-8"
                },
                "body": {
                    "input": {"tr_id": "H0STCNT0", "tr_key": "005930"}
                }
            })
        );
    }

    #[test]
    fn execution_feed_uses_notice_code() {
        assert_eq!(FeedKind::ExecutionNotice.tr_id(), "H0STCNI0");
    }
}
