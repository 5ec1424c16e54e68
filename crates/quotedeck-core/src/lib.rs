//! # Quotedeck Core
//!
//! Multi-source price and sentiment aggregation for a portfolio dashboard.
//!
//! ## Overview
//!
//! This crate provides the data layer behind the dashboard:
//!
//! - **Canonical domain models** for quotes and sentiment indices
//! - **Symbol classification** routing each ticker to the right feed
//! - **Feed adapters** for crypto tickers, equity charts, the fear/greed
//!   index, and model-estimated sentiment
//! - **An aggregator** maintaining one quote table with
//!   upsert-on-success, retain-on-failure merge semantics
//! - **A scheduler** driving price and sentiment refreshes on
//!   independent jittered cadences
//! - **KV-backed persistence** for sentiment warm starts and user
//!   portfolio state
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Upstream feed adapters |
//! | [`aggregator`] | Quote table aggregation and snapshot publishing |
//! | [`analysis`] | Model-backed market analysis |
//! | [`classify`] | Symbol classification and venue policy |
//! | [`domain`] | Domain models (Quote, SentimentIndex, Symbol) |
//! | [`error`] | Core error types |
//! | [`feed`] | Feed traits and structured fetch errors |
//! | [`fx`] | Display-currency conversion |
//! | [`http_client`] | HTTP client abstraction |
//! | [`market_clock`] | Trading-hours calendar |
//! | [`rate_gate`] | Local request quota gating |
//! | [`scheduler`] | Periodic refresh driver |
//! | [`sentiment_cache`] | KV persistence for sentiment indices |
//! | [`store`] | Watchlist, holdings, and analysis history |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use quotedeck_core::{
//!     Aggregator, BinanceTicker, EquityChart, FearGreedIndex, RefreshConfig,
//!     RefreshScheduler, ReqwestHttpClient, StaticSentiment, Symbol,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let http: Arc<dyn quotedeck_core::HttpClient> = Arc::new(ReqwestHttpClient::new());
//!     let aggregator = Arc::new(Aggregator::new(
//!         Arc::new(BinanceTicker::new(Arc::clone(&http))),
//!         Arc::new(EquityChart::new(Arc::clone(&http))),
//!         Arc::new(FearGreedIndex::new(Arc::clone(&http))),
//!         Arc::new(StaticSentiment),
//!     ));
//!
//!     let scheduler = RefreshScheduler::start(
//!         Arc::clone(&aggregator),
//!         RefreshConfig::default(),
//!         || vec![Symbol::parse("BTCUSDT").expect("valid symbol")],
//!     );
//!
//!     let mut updates = aggregator.subscribe();
//!     while updates.changed().await.is_ok() {
//!         let snapshot = updates.borrow().clone();
//!         println!("{} quotes", snapshot.quotes.len());
//!     }
//!     scheduler.stop();
//! }
//! ```
//!
//! ## Error Handling
//!
//! Feed failures are structured and never destructive:
//!
//! ```rust
//! use quotedeck_core::{FetchError, FetchErrorKind};
//!
//! fn handle_error(error: FetchError) {
//!     match error.kind() {
//!         FetchErrorKind::RateLimitOrAuth => {
//!             // Wait for the next cycle
//!         }
//!         FetchErrorKind::CredentialMissing => {
//!             // Surface configuration problem to the user
//!         }
//!         _ => {}
//!     }
//! }
//! ```
//!
//! ## Security
//!
//! - API keys are read from environment variables only (never logged)
//! - Input validation on all domain types

pub mod adapters;
pub mod aggregator;
pub mod analysis;
pub mod classify;
pub mod domain;
pub mod error;
pub mod feed;
pub mod fx;
pub mod http_client;
pub mod market_clock;
pub mod rate_gate;
pub mod scheduler;
pub mod sentiment_cache;
pub mod store;

// Re-export commonly used types at crate root for convenience

// Adapter implementations
pub use adapters::{
    BinanceTicker, EquityChart, FallbackSentiment, FearGreedIndex, ModelSentiment,
    StaticSentiment, EQUITY_RELAY_ENV,
};

// Aggregation
pub use aggregator::{Aggregator, DeckSnapshot};

// Model analysis
pub use analysis::{
    AnalysisClient, AnalysisRequest, GeminiClient, Locale, MarketAnalysis, Recommendation,
    GEMINI_API_KEY_ENV,
};

// Classification
pub use classify::{classify, AssetClass, VenuePolicy};

// Domain models
pub use domain::{
    MarketState, Quote, SentimentDomain, SentimentIndex, SentimentLabel, SentimentOrigin, Symbol,
    UtcDateTime,
};

// Error types
pub use error::{CoreError, ValidationError};

// Feed contracts
pub use feed::{
    FeedFuture, FeedId, FetchError, FetchErrorKind, PriceFeed, PriceSnapshot, SentimentFeed,
};

// Currency conversion
pub use fx::{from_usd, Currency};

// HTTP client types
pub use http_client::{
    HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, NoopHttpClient,
    ReqwestHttpClient,
};

// Market hours
pub use market_clock::MarketCalendar;

// Rate limiting
pub use rate_gate::RateGate;

// Scheduling
pub use scheduler::{RefreshConfig, RefreshScheduler};

// Persistence
pub use sentiment_cache::{FileKvStore, KvStore, MemoryKvStore, SentimentCache};
pub use store::{
    lot_performance, AnalysisRecord, HoldingLot, LotPerformance, PortfolioStore,
};
