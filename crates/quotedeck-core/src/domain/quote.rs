use serde::{Deserialize, Serialize};

use crate::{Symbol, UtcDateTime, ValidationError};

/// Whether the quote reflects a live session or a last close.
///
/// `ClosedUsingLastClose` quotes always carry `change_percent = 0` so a
/// stale intraday delta is never shown while the market is shut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketState {
    Open,
    ClosedUsingLastClose,
}

/// Unified per-symbol quote merged from heterogeneous feeds.
///
/// `price` is always the last successfully fetched value for the symbol;
/// a failed refresh never resets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: Symbol,
    pub price: f64,
    pub change_percent: f64,
    pub as_of: UtcDateTime,
    pub market_state: MarketState,
}

impl Quote {
    pub fn new(
        symbol: Symbol,
        price: f64,
        change_percent: f64,
        as_of: UtcDateTime,
        market_state: MarketState,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("price", price)?;
        validate_finite("change_percent", change_percent)?;

        Ok(Self {
            symbol,
            price,
            change_percent,
            as_of,
            market_state,
        })
    }
}

fn validate_finite(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    Ok(())
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    validate_finite(field, value)?;
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}
