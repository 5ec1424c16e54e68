//! Concrete upstream feed adapters.
//!
//! | Adapter | Feed | Serves |
//! |---------|------|--------|
//! | [`BinanceTicker`] | `binance` | Crypto pair prices |
//! | [`EquityChart`] | `equity_chart` | Equity prices via daily chart meta |
//! | [`FearGreedIndex`] | `fear_greed` | Crypto sentiment index |
//! | [`ModelSentiment`] / [`StaticSentiment`] / [`FallbackSentiment`] | `model_estimate` | Equity sentiment ladder |

mod binance;
mod equity_chart;
mod fear_greed;
mod sentiment;

pub use binance::BinanceTicker;
pub use equity_chart::{EquityChart, EQUITY_RELAY_ENV};
pub use fear_greed::FearGreedIndex;
pub use sentiment::{FallbackSentiment, ModelSentiment, StaticSentiment};
