mod quote;
mod sentiment;
mod symbol;
mod timestamp;

pub use quote::{MarketState, Quote};
pub use sentiment::{SentimentDomain, SentimentIndex, SentimentLabel, SentimentOrigin};
pub use symbol::Symbol;
pub use timestamp::UtcDateTime;
