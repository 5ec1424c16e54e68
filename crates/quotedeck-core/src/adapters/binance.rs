use std::sync::Arc;

use serde::Deserialize;

use crate::feed::{FeedFuture, FeedId, FetchError, PriceFeed, PriceSnapshot};
use crate::http_client::{HttpClient, HttpRequest, NoopHttpClient, DEFAULT_TIMEOUT_MS};
use crate::Symbol;

const DEFAULT_BASE_URL: &str = "https://api.binance.com";

/// Crypto price adapter backed by the Binance 24hr ticker endpoint.
///
/// The endpoint reports decimal fields as strings, so prices are parsed
/// rather than deserialized as numbers.
#[derive(Clone)]
pub struct BinanceTicker {
    http: Arc<dyn HttpClient>,
    base_url: String,
    timeout_ms: u64,
}

impl Default for BinanceTicker {
    fn default() -> Self {
        Self {
            http: Arc::new(NoopHttpClient),
            base_url: String::from(DEFAULT_BASE_URL),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl BinanceTicker {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self {
            http,
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    fn ticker_url(&self, symbol: &Symbol) -> String {
        format!(
            "{}/api/v3/ticker/24hr?symbol={}",
            self.base_url,
            urlencoding::encode(symbol.as_str())
        )
    }
}

#[derive(Debug, Deserialize)]
struct TickerPayload {
    #[serde(rename = "lastPrice")]
    last_price: String,
    #[serde(rename = "priceChangePercent")]
    price_change_percent: String,
}

fn parse_decimal(field: &str, raw: &str, symbol: &Symbol) -> Result<f64, FetchError> {
    raw.trim().parse::<f64>().map_err(|_| {
        FetchError::parse(
            FeedId::Binance,
            format!("field '{field}' is not a decimal number: '{raw}'"),
        )
        .for_symbol(symbol.clone())
    })
}

impl PriceFeed for BinanceTicker {
    fn id(&self) -> FeedId {
        FeedId::Binance
    }

    fn fetch<'a>(&'a self, symbol: &'a Symbol) -> FeedFuture<'a, PriceSnapshot> {
        Box::pin(async move {
            let request = HttpRequest::get(self.ticker_url(symbol))
                .with_timeout_ms(self.timeout_ms);

            let response = self.http.execute(request).await.map_err(|error| {
                let err = if error.timed_out() {
                    FetchError::timeout(FeedId::Binance, error.message())
                } else {
                    FetchError::network(FeedId::Binance, error.message())
                };
                err.for_symbol(symbol.clone())
            })?;

            if !response.is_success() {
                let err = if (400..500).contains(&response.status) {
                    FetchError::rate_limit_or_auth(
                        FeedId::Binance,
                        format!("upstream returned status {}", response.status),
                    )
                } else {
                    FetchError::network(
                        FeedId::Binance,
                        format!("upstream returned status {}", response.status),
                    )
                };
                return Err(err.for_symbol(symbol.clone()));
            }

            let payload: TickerPayload = serde_json::from_str(&response.body).map_err(|e| {
                FetchError::parse(FeedId::Binance, format!("invalid ticker payload: {e}"))
                    .for_symbol(symbol.clone())
            })?;

            Ok(PriceSnapshot {
                price: parse_decimal("lastPrice", &payload.last_price, symbol)?,
                change_percent: parse_decimal(
                    "priceChangePercent",
                    &payload.price_change_percent,
                    symbol,
                )?,
            })
        })
    }
}
