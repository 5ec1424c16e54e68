//! Symbol classification and venue-qualified tickers.
//!
//! Classification is the single rule that routes every symbol to the right
//! feed adapter. It must be applied identically wherever a symbol is routed
//! (watchlist refresh, holdings refresh, chart embed) so the same symbol
//! never behaves differently across views.

use serde::{Deserialize, Serialize};

use crate::Symbol;

/// Asset class derived from the symbol string, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Crypto,
    Equity,
}

/// Quote-asset suffixes that mark a symbol as a crypto pair.
pub const CRYPTO_QUOTE_SUFFIXES: &[&str] = &[
    "USDT", "USDC", "FDUSD", "TUSD", "BUSD", "DAI", "BTC", "ETH", "BNB",
];

/// Classify a raw ticker string. Pure and total: any string maps to exactly
/// one class, defaulting to `Equity`.
///
/// A symbol is `Crypto` iff it ends with a known quote-asset suffix and is
/// strictly longer than that suffix (a bare quote asset is not a pair).
pub fn classify(raw: &str) -> AssetClass {
    let normalized = raw.trim().to_ascii_uppercase();
    for suffix in CRYPTO_QUOTE_SUFFIXES {
        if normalized.len() > suffix.len() && normalized.ends_with(suffix) {
            return AssetClass::Crypto;
        }
    }
    AssetClass::Equity
}

/// Home-market suffix policy for equity symbols.
///
/// Numeric tickers belong to the home market and get the suffix before the
/// quote feed sees them; alphabetic tickers pass through unqualified. The
/// qualified form is never shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenuePolicy {
    home_suffix: String,
}

impl Default for VenuePolicy {
    fn default() -> Self {
        Self {
            home_suffix: String::from(".TW"),
        }
    }
}

impl VenuePolicy {
    pub fn new(home_suffix: impl Into<String>) -> Self {
        Self {
            home_suffix: home_suffix.into(),
        }
    }

    /// Venue-qualified ticker used only by the equity quote adapter.
    pub fn venue_ticker(&self, symbol: &Symbol) -> String {
        let raw = symbol.as_str();
        if !raw.is_empty() && raw.chars().all(|ch| ch.is_ascii_digit()) {
            format!("{raw}{}", self.home_suffix)
        } else {
            raw.to_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_is_total() {
        assert_eq!(classify("BTCUSDT"), AssetClass::Crypto);
        assert_eq!(classify("ethusdc"), AssetClass::Crypto);
        assert_eq!(classify("SOLBTC"), AssetClass::Crypto);
        assert_eq!(classify("AAPL"), AssetClass::Equity);
        assert_eq!(classify("2330"), AssetClass::Equity);
        assert_eq!(classify(""), AssetClass::Equity);
        assert_eq!(classify("   "), AssetClass::Equity);
    }

    #[test]
    fn bare_quote_asset_is_not_a_pair() {
        assert_eq!(classify("BTC"), AssetClass::Equity);
        assert_eq!(classify("USDT"), AssetClass::Equity);
    }

    #[test]
    fn numeric_tickers_get_home_suffix() {
        let policy = VenuePolicy::default();
        let home = Symbol::parse("2330").expect("valid symbol");
        let us = Symbol::parse("AAPL").expect("valid symbol");

        assert_eq!(policy.venue_ticker(&home), "2330.TW");
        assert_eq!(policy.venue_ticker(&us), "AAPL");
    }

    #[test]
    fn mixed_tickers_pass_through() {
        let policy = VenuePolicy::new(".HK");
        let symbol = Symbol::parse("BRK-B").expect("valid symbol");
        assert_eq!(policy.venue_ticker(&symbol), "BRK-B");
    }
}
