use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Market domain a sentiment reading applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentDomain {
    Equities,
    Crypto,
}

impl SentimentDomain {
    pub const ALL: [Self; 2] = [Self::Equities, Self::Crypto];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Equities => "equities",
            Self::Crypto => "crypto",
        }
    }
}

impl Display for SentimentDomain {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse bucket of a clamped sentiment score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    ExtremeFear,
    Fear,
    Neutral,
    Greed,
    ExtremeGreed,
}

impl SentimentLabel {
    /// Deterministic bucket for a score already clamped to [0, 100].
    pub const fn for_score(score: u8) -> Self {
        if score < 25 {
            Self::ExtremeFear
        } else if score < 45 {
            Self::Fear
        } else if score < 55 {
            Self::Neutral
        } else if score < 75 {
            Self::Greed
        } else {
            Self::ExtremeGreed
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ExtremeFear => "Extreme Fear",
            Self::Fear => "Fear",
            Self::Neutral => "Neutral",
            Self::Greed => "Greed",
            Self::ExtremeGreed => "Extreme Greed",
        }
    }
}

impl Display for SentimentLabel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trust tier of the producer behind a sentiment reading.
///
/// `ModelEstimate` and `StaticFallback` are degraded-confidence channels
/// and must be surfaced as such by the embedding UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentOrigin {
    IndexFeed,
    ModelEstimate,
    StaticFallback,
}

/// Normalized fear/greed reading for one market domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentIndex {
    pub domain: SentimentDomain,
    pub score: u8,
    pub label: SentimentLabel,
    pub origin: SentimentOrigin,
}

impl SentimentIndex {
    /// Build a reading from an untrusted raw score, clamping into [0, 100].
    /// The label is always derived from the clamped score so every producer
    /// agrees on the bucket table.
    pub fn from_raw(domain: SentimentDomain, raw_score: i64, origin: SentimentOrigin) -> Self {
        let score = raw_score.clamp(0, 100) as u8;
        Self {
            domain,
            score,
            label: SentimentLabel::for_score(score),
            origin,
        }
    }

    /// The mid-range reading used when no sentiment source is reachable.
    pub fn neutral_fallback(domain: SentimentDomain) -> Self {
        Self::from_raw(domain, 50, SentimentOrigin::StaticFallback)
    }
}
