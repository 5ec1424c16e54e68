//! Display-currency conversion with fixed reference rates.
//!
//! All feed prices are denominated in USD. Conversion only affects how
//! amounts are presented, never what is stored.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Supported display currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Currency {
    Usd,
    Twd,
    Myr,
}

impl Currency {
    pub const ALL: [Currency; 3] = [Currency::Usd, Currency::Twd, Currency::Myr];

    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Usd => "$",
            Self::Twd => "NT$",
            Self::Myr => "RM",
        }
    }

    /// Units of this currency per USD.
    pub const fn rate(self) -> f64 {
        match self {
            Self::Usd => 1.0,
            Self::Twd => 32.5,
            Self::Myr => 4.7,
        }
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Converts a USD amount into the given display currency.
pub fn from_usd(amount_usd: f64, currency: Currency) -> f64 {
    amount_usd * currency.rate()
}
