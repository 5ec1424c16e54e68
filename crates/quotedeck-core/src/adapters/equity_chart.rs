use std::sync::Arc;

use serde::Deserialize;

use crate::classify::VenuePolicy;
use crate::feed::{FeedFuture, FeedId, FetchError, PriceFeed, PriceSnapshot};
use crate::http_client::{HttpClient, HttpRequest, NoopHttpClient, DEFAULT_TIMEOUT_MS};
use crate::Symbol;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Environment variable naming an optional relay prefix for chart requests.
///
/// Browser-context deployments cannot call the chart host directly, so the
/// provider URL is percent-encoded and appended to the relay prefix.
pub const EQUITY_RELAY_ENV: &str = "QUOTEDECK_EQUITY_RELAY";

/// Equity price adapter backed by the daily chart endpoint.
///
/// The endpoint reports the latest trade and the previous close in one
/// metadata block, which is enough to derive day-over-day movement without
/// pulling the full candle series.
#[derive(Clone)]
pub struct EquityChart {
    http: Arc<dyn HttpClient>,
    base_url: String,
    relay: Option<String>,
    venue: VenuePolicy,
    timeout_ms: u64,
}

impl Default for EquityChart {
    fn default() -> Self {
        Self {
            http: Arc::new(NoopHttpClient),
            base_url: String::from(DEFAULT_BASE_URL),
            relay: std::env::var(EQUITY_RELAY_ENV).ok().filter(|r| !r.is_empty()),
            venue: VenuePolicy::default(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl EquityChart {
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

    pub fn with_relay(mut self, relay: Option<String>) -> Self {
        self.relay = relay.filter(|r| !r.is_empty());
        self
    }

    pub fn with_venue(mut self, venue: VenuePolicy) -> Self {
        self.venue = venue;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    fn chart_url(&self, symbol: &Symbol) -> String {
        let provider_url = format!(
            "{}/v8/finance/chart/{}?interval=1d&range=1d",
            self.base_url,
            self.venue.venue_ticker(symbol)
        );
        match &self.relay {
            Some(relay) => format!("{relay}{}", urlencoding::encode(&provider_url)),
            None => provider_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Vec<ChartResult>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(rename = "regularMarketPrice")]
    regular_market_price: f64,
    #[serde(rename = "previousClose")]
    previous_close: f64,
}

impl PriceFeed for EquityChart {
    fn id(&self) -> FeedId {
        FeedId::EquityChart
    }

    fn fetch<'a>(&'a self, symbol: &'a Symbol) -> FeedFuture<'a, PriceSnapshot> {
        Box::pin(async move {
            let request = HttpRequest::get(self.chart_url(symbol))
                .with_timeout_ms(self.timeout_ms);

            let response = self.http.execute(request).await.map_err(|error| {
                let err = if error.timed_out() {
                    FetchError::timeout(FeedId::EquityChart, error.message())
                } else {
                    FetchError::network(FeedId::EquityChart, error.message())
                };
                err.for_symbol(symbol.clone())
            })?;

            if !response.is_success() {
                let err = if (400..500).contains(&response.status) {
                    FetchError::rate_limit_or_auth(
                        FeedId::EquityChart,
                        format!("upstream returned status {}", response.status),
                    )
                } else {
                    FetchError::network(
                        FeedId::EquityChart,
                        format!("upstream returned status {}", response.status),
                    )
                };
                return Err(err.for_symbol(symbol.clone()));
            }

            let envelope: ChartEnvelope = serde_json::from_str(&response.body).map_err(|e| {
                FetchError::parse(FeedId::EquityChart, format!("invalid chart payload: {e}"))
                    .for_symbol(symbol.clone())
            })?;

            let meta = envelope
                .chart
                .result
                .first()
                .map(|r| &r.meta)
                .ok_or_else(|| {
                    FetchError::parse(FeedId::EquityChart, "chart result is empty")
                        .for_symbol(symbol.clone())
                })?;

            if meta.previous_close <= 0.0 || !meta.previous_close.is_finite() {
                return Err(FetchError::parse(
                    FeedId::EquityChart,
                    format!("previous close is unusable: {}", meta.previous_close),
                )
                .for_symbol(symbol.clone()));
            }

            let change_percent =
                (meta.regular_market_price - meta.previous_close) / meta.previous_close * 100.0;

            Ok(PriceSnapshot {
                price: meta.regular_market_price,
                change_percent,
            })
        })
    }
}
