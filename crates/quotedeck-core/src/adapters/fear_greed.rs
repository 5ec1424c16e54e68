use std::sync::Arc;

use serde::Deserialize;

use crate::domain::{SentimentDomain, SentimentIndex, SentimentOrigin};
use crate::feed::{FeedFuture, FeedId, FetchError, SentimentFeed};
use crate::http_client::{HttpClient, HttpRequest, NoopHttpClient, DEFAULT_TIMEOUT_MS};

const DEFAULT_BASE_URL: &str = "https://api.alternative.me";

/// Crypto sentiment adapter backed by the alternative.me fear & greed index.
///
/// The upstream classification string is discarded; the label is always
/// derived locally from the numeric score so both stay consistent.
#[derive(Clone)]
pub struct FearGreedIndex {
    http: Arc<dyn HttpClient>,
    base_url: String,
    timeout_ms: u64,
}

impl Default for FearGreedIndex {
    fn default() -> Self {
        Self {
            http: Arc::new(NoopHttpClient),
            base_url: String::from(DEFAULT_BASE_URL),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl FearGreedIndex {
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
}

#[derive(Debug, Deserialize)]
struct FngEnvelope {
    #[serde(default)]
    data: Vec<FngEntry>,
}

#[derive(Debug, Deserialize)]
struct FngEntry {
    value: String,
}

impl SentimentFeed for FearGreedIndex {
    fn id(&self) -> FeedId {
        FeedId::FearGreed
    }

    fn fetch(&self, domain: SentimentDomain) -> FeedFuture<'_, SentimentIndex> {
        Box::pin(async move {
            if domain != SentimentDomain::Crypto {
                return Err(FetchError::invalid_request(
                    FeedId::FearGreed,
                    format!("index only covers crypto, requested {domain:?}"),
                ));
            }

            let request = HttpRequest::get(format!("{}/fng/", self.base_url))
                .with_timeout_ms(self.timeout_ms);

            let response = self.http.execute(request).await.map_err(|error| {
                if error.timed_out() {
                    FetchError::timeout(FeedId::FearGreed, error.message())
                } else {
                    FetchError::network(FeedId::FearGreed, error.message())
                }
            })?;

            if !response.is_success() {
                return Err(FetchError::network(
                    FeedId::FearGreed,
                    format!("upstream returned status {}", response.status),
                ));
            }

            let envelope: FngEnvelope = serde_json::from_str(&response.body).map_err(|e| {
                FetchError::parse(FeedId::FearGreed, format!("invalid index payload: {e}"))
            })?;

            let entry = envelope.data.first().ok_or_else(|| {
                FetchError::parse(FeedId::FearGreed, "index data array is empty")
            })?;

            let raw_score = entry.value.trim().parse::<i64>().map_err(|_| {
                FetchError::parse(
                    FeedId::FearGreed,
                    format!("index value is not an integer: '{}'", entry.value),
                )
            })?;

            Ok(SentimentIndex::from_raw(
                SentimentDomain::Crypto,
                raw_score,
                SentimentOrigin::IndexFeed,
            ))
        })
    }
}
