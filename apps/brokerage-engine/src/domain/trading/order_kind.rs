//! Order and revision kinds.

use serde::{Deserialize, Serialize};

/// Order pricing kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderKind {
    /// Limit order at the given price.
    #[default]
    Limit,
    /// Market order; the price is sent as zero.
    Market,
}

impl OrderKind {
    /// Brokerage order division code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Limit => "00",
            Self::Market => "01",
        }
    }
}

/// What a revision request does to an open order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RevisionKind {
    /// Change quantity or price.
    Revise,
    /// Cancel.
    Cancel,
}

impl RevisionKind {
    /// Brokerage revise/cancel division code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Revise => "01",
            Self::Cancel => "02",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes() {
        assert_eq!(OrderKind::Limit.code(), "00");
        assert_eq!(OrderKind::Market.code(), "01");
        assert_eq!(RevisionKind::Revise.code(), "01");
        assert_eq!(RevisionKind::Cancel.code(), "02");
    }
}
