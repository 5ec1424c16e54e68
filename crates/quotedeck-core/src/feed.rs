//! Feed trait and error types shared by every upstream adapter.
//!
//! This module defines the adapter contracts ([`PriceFeed`] and
//! [`SentimentFeed`]) that all provider implementations follow, along with
//! the structured [`FetchError`] used to report upstream failures without
//! disturbing previously published data.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::domain::{SentimentDomain, SentimentIndex, Symbol};

/// Identity of a concrete upstream feed, used in logs and error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedId {
    Binance,
    EquityChart,
    FearGreed,
    ModelEstimate,
}

impl FeedId {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Binance => "binance",
            Self::EquityChart => "equity_chart",
            Self::FearGreed => "fear_greed",
            Self::ModelEstimate => "model_estimate",
        }
    }
}

impl Display for FeedId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of a feed failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorKind {
    /// Transport failure: DNS, connection refused, non-2xx server error.
    Network,
    /// The request exceeded its deadline.
    Timeout,
    /// The upstream responded but the payload could not be decoded.
    Parse,
    /// The upstream rejected the request (429/4xx quota or key problems).
    RateLimitOrAuth,
    /// The model backend declined or returned an unusable completion.
    ModelUnavailable,
    /// A required credential is not configured.
    CredentialMissing,
    /// The caller asked this feed for something it cannot serve.
    InvalidRequest,
}

/// Structured error returned by feed adapters.
///
/// A `FetchError` never removes data already published: callers log it and
/// keep the previous value for the affected symbol or domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    kind: FetchErrorKind,
    feed: FeedId,
    symbol: Option<Symbol>,
    message: String,
}

impl FetchError {
    pub fn network(feed: FeedId, message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Network,
            feed,
            symbol: None,
            message: message.into(),
        }
    }

    pub fn timeout(feed: FeedId, message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Timeout,
            feed,
            symbol: None,
            message: message.into(),
        }
    }

    pub fn parse(feed: FeedId, message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Parse,
            feed,
            symbol: None,
            message: message.into(),
        }
    }

    pub fn rate_limit_or_auth(feed: FeedId, message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::RateLimitOrAuth,
            feed,
            symbol: None,
            message: message.into(),
        }
    }

    pub fn model_unavailable(feed: FeedId, message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::ModelUnavailable,
            feed,
            symbol: None,
            message: message.into(),
        }
    }

    pub fn credential_missing(feed: FeedId, message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::CredentialMissing,
            feed,
            symbol: None,
            message: message.into(),
        }
    }

    pub fn invalid_request(feed: FeedId, message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::InvalidRequest,
            feed,
            symbol: None,
            message: message.into(),
        }
    }

    pub fn for_symbol(mut self, symbol: Symbol) -> Self {
        self.symbol = Some(symbol);
        self
    }

    pub const fn kind(&self) -> FetchErrorKind {
        self.kind
    }

    pub const fn feed(&self) -> FeedId {
        self.feed
    }

    pub fn symbol(&self) -> Option<&Symbol> {
        self.symbol.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether a later refresh cycle can reasonably be expected to succeed
    /// without operator intervention.
    pub const fn retryable(&self) -> bool {
        match self.kind {
            FetchErrorKind::Network
            | FetchErrorKind::Timeout
            | FetchErrorKind::RateLimitOrAuth
            | FetchErrorKind::ModelUnavailable => true,
            FetchErrorKind::Parse
            | FetchErrorKind::CredentialMissing
            | FetchErrorKind::InvalidRequest => false,
        }
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            FetchErrorKind::Network => "feed.network",
            FetchErrorKind::Timeout => "feed.timeout",
            FetchErrorKind::Parse => "feed.parse",
            FetchErrorKind::RateLimitOrAuth => "feed.rate_limit_or_auth",
            FetchErrorKind::ModelUnavailable => "feed.model_unavailable",
            FetchErrorKind::CredentialMissing => "feed.credential_missing",
            FetchErrorKind::InvalidRequest => "feed.invalid_request",
        }
    }
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.symbol {
            Some(symbol) => write!(
                f,
                "[{}] {} for {} ({})",
                self.feed, self.message, symbol, self.code()
            ),
            None => write!(f, "[{}] {} ({})", self.feed, self.message, self.code()),
        }
    }
}

impl std::error::Error for FetchError {}

/// Price and day-over-day movement for one instrument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceSnapshot {
    pub price: f64,
    pub change_percent: f64,
}

/// Boxed future type returned by feed trait methods.
pub type FeedFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, FetchError>> + Send + 'a>>;

/// Contract implemented by per-asset-class price adapters.
pub trait PriceFeed: Send + Sync {
    fn id(&self) -> FeedId;

    fn fetch<'a>(&'a self, symbol: &'a Symbol) -> FeedFuture<'a, PriceSnapshot>;
}

/// Contract implemented by sentiment index adapters.
pub trait SentimentFeed: Send + Sync {
    fn id(&self) -> FeedId;

    fn fetch(&self, domain: SentimentDomain) -> FeedFuture<'_, SentimentIndex>;
}
