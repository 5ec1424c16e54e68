//! Persistent user state: watchlist, holdings, analysis history.
//!
//! Everything lives behind the same [`KvStore`] abstraction as the
//! sentiment cache, one JSON document per key. Unreadable documents fall
//! back to defaults instead of failing.

use serde::{Deserialize, Serialize};

use crate::analysis::MarketAnalysis;
use crate::domain::{Quote, Symbol, UtcDateTime};
use crate::sentiment_cache::KvStore;

const WATCHLIST_KEY: &str = "portfolio.watchlist";
const HOLDINGS_KEY: &str = "portfolio.holdings";
const HISTORY_KEY: &str = "portfolio.analysis_history";
const PRIVACY_KEY: &str = "portfolio.privacy";

/// Retained analysis records, most recent first.
const HISTORY_LIMIT: usize = 50;

/// A single purchase lot of one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingLot {
    pub symbol: Symbol,
    pub quantity: f64,
    pub unit_cost: f64,
    /// Purchase date as entered by the user, not validated as a timestamp.
    pub buy_date: String,
}

/// Valuation of one lot against a current quote.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LotPerformance {
    pub market_value: f64,
    pub profit: f64,
    pub ratio_percent: f64,
}

/// Values a lot at the given quote. A zero-cost lot reports a zero ratio
/// rather than dividing by zero.
pub fn lot_performance(lot: &HoldingLot, quote: &Quote) -> LotPerformance {
    let market_value = lot.quantity * quote.price;
    let cost_basis = lot.quantity * lot.unit_cost;
    let profit = market_value - cost_basis;
    let ratio_percent = if cost_basis > 0.0 {
        profit / cost_basis * 100.0
    } else {
        0.0
    };
    LotPerformance {
        market_value,
        profit,
        ratio_percent,
    }
}

/// One archived model analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub symbol: Symbol,
    pub recorded_at: UtcDateTime,
    pub analysis: MarketAnalysis,
}

/// KV-backed persistence for user-owned portfolio state.
pub struct PortfolioStore {
    store: Box<dyn KvStore>,
}

impl PortfolioStore {
    pub fn new(store: Box<dyn KvStore>) -> Self {
        Self { store }
    }

    fn load_json<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        let raw = self.store.load(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::debug!(key, "discarding corrupt stored document: {error}");
                None
            }
        }
    }

    fn save_json<T: Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(raw) => self.store.save(key, &raw),
            Err(error) => tracing::warn!(key, "document serialization failed: {error}"),
        }
    }

    /// Tracked symbols. A fresh store starts with a seed watchlist so the
    /// dashboard is never empty on first launch.
    pub fn watchlist(&self) -> Vec<Symbol> {
        self.load_json(WATCHLIST_KEY)
            .unwrap_or_else(default_watchlist)
    }

    pub fn set_watchlist(&self, symbols: &[Symbol]) {
        self.save_json(WATCHLIST_KEY, &symbols);
    }

    /// Adds a symbol unless already tracked. Returns whether it was added.
    pub fn add_symbol(&self, symbol: Symbol) -> bool {
        let mut symbols = self.watchlist();
        if symbols.contains(&symbol) {
            return false;
        }
        symbols.push(symbol);
        self.set_watchlist(&symbols);
        true
    }

    pub fn remove_symbol(&self, symbol: &Symbol) {
        let mut symbols = self.watchlist();
        symbols.retain(|s| s != symbol);
        self.set_watchlist(&symbols);
    }

    pub fn holdings(&self) -> Vec<HoldingLot> {
        self.load_json(HOLDINGS_KEY).unwrap_or_default()
    }

    pub fn set_holdings(&self, lots: &[HoldingLot]) {
        self.save_json(HOLDINGS_KEY, &lots);
    }

    /// Prepends a record and trims the history to its cap.
    pub fn push_analysis(&self, record: AnalysisRecord) {
        let mut history = self.analysis_history();
        history.insert(0, record);
        history.truncate(HISTORY_LIMIT);
        self.save_json(HISTORY_KEY, &history);
    }

    pub fn analysis_history(&self) -> Vec<AnalysisRecord> {
        self.load_json(HISTORY_KEY).unwrap_or_default()
    }

    /// Privacy mode hides monetary amounts in the presentation layer.
    pub fn privacy_enabled(&self) -> bool {
        self.load_json(PRIVACY_KEY).unwrap_or(false)
    }

    pub fn set_privacy(&self, enabled: bool) {
        self.save_json(PRIVACY_KEY, &enabled);
    }
}

fn default_watchlist() -> Vec<Symbol> {
    ["BTCUSDT", "AAPL", "NVDA", "ETHUSDT"]
        .iter()
        .filter_map(|raw| Symbol::parse(raw).ok())
        .collect()
}
