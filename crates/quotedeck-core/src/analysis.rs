//! Model-backed market analysis.
//!
//! [`AnalysisClient`] is the seam between the aggregation layer and the
//! generative backend. [`GeminiClient`] is the production implementation;
//! tests substitute scripted clients.

use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::{SentimentDomain, SentimentLabel, Symbol};
use crate::feed::{FeedFuture, FeedId, FetchError};
use crate::http_client::{HttpClient, HttpRequest, DEFAULT_TIMEOUT_MS};
use crate::rate_gate::RateGate;

/// Environment variable holding the model API key.
pub const GEMINI_API_KEY_ENV: &str = "QUOTEDECK_GEMINI_API_KEY";

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Output language requested from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locale {
    En,
    ZhTw,
}

impl Locale {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::ZhTw => "zh-TW",
        }
    }
}

impl Display for Locale {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stance the model takes on an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    Buy,
    Hold,
    Sell,
    Neutral,
}

/// Input for a single-instrument analysis call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub symbol: Symbol,
    pub locale: Locale,
}

/// Structured analysis produced by the model backend.
///
/// `sentiment_label` is always derived from `sentiment_score` after
/// clamping, never taken from model output, so the pair cannot disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketAnalysis {
    pub summary: String,
    pub recommendation: Recommendation,
    pub detailed_analysis: String,
    pub sentiment_score: u8,
    pub sentiment_label: SentimentLabel,
    pub key_levels: Vec<String>,
}

/// Contract for the generative analysis backend.
pub trait AnalysisClient: Send + Sync {
    fn analyze(&self, request: &AnalysisRequest) -> FeedFuture<'_, MarketAnalysis>;

    /// Estimates a 0-100 sentiment score for a whole market segment.
    fn estimate_sentiment(&self, domain: SentimentDomain) -> FeedFuture<'_, i64>;
}

/// Production analysis client backed by the Gemini `generateContent` API.
#[derive(Clone)]
pub struct GeminiClient {
    http: Arc<dyn HttpClient>,
    api_key: Option<String>,
    base_url: String,
    model: String,
    gate: RateGate,
    timeout_ms: u64,
}

impl GeminiClient {
    /// Builds a client reading the API key from [`GEMINI_API_KEY_ENV`].
    ///
    /// A missing key is not an error here: it surfaces as
    /// [`FetchErrorKind::CredentialMissing`](crate::feed::FetchErrorKind)
    /// on the first call, so callers can route to a fallback.
    pub fn from_env(http: Arc<dyn HttpClient>) -> Self {
        let api_key = std::env::var(GEMINI_API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty());
        Self::new(http, api_key)
    }

    pub fn new(http: Arc<dyn HttpClient>, api_key: Option<String>) -> Self {
        Self {
            http,
            api_key,
            base_url: String::from(DEFAULT_BASE_URL),
            model: String::from(DEFAULT_MODEL),
            gate: RateGate::new(Duration::from_secs(60), 10),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_rate_gate(mut self, gate: RateGate) -> Self {
        self.gate = gate;
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    async fn generate(&self, prompt: String, schema: serde_json::Value) -> Result<String, FetchError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            FetchError::credential_missing(
                FeedId::ModelEstimate,
                format!("{GEMINI_API_KEY_ENV} is not set"),
            )
        })?;

        if let Err(delay) = self.gate.try_acquire() {
            return Err(FetchError::rate_limit_or_auth(
                FeedId::ModelEstimate,
                format!("local quota exhausted, retry in {}s", delay.as_secs()),
            ));
        }

        let body = json!({
            "contents": [{"parts": [{"text": prompt}]}],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": schema,
            },
        });

        let request = HttpRequest::post(self.endpoint())
            .with_header("x-goog-api-key", api_key)
            .with_json_body(body.to_string())
            .with_timeout_ms(self.timeout_ms);

        let response = self.http.execute(request).await.map_err(|error| {
            if error.timed_out() {
                FetchError::timeout(FeedId::ModelEstimate, error.message())
            } else {
                FetchError::network(FeedId::ModelEstimate, error.message())
            }
        })?;

        if response.status == 429 || response.status == 401 || response.status == 403 {
            return Err(FetchError::rate_limit_or_auth(
                FeedId::ModelEstimate,
                format!("model backend returned status {}", response.status),
            ));
        }
        if !response.is_success() {
            return Err(FetchError::model_unavailable(
                FeedId::ModelEstimate,
                format!("model backend returned status {}", response.status),
            ));
        }

        let envelope: GenerateEnvelope = serde_json::from_str(&response.body).map_err(|e| {
            FetchError::parse(
                FeedId::ModelEstimate,
                format!("invalid completion envelope: {e}"),
            )
        })?;

        let text = envelope
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| {
                FetchError::model_unavailable(
                    FeedId::ModelEstimate,
                    "completion has no candidates",
                )
            })?;

        Ok(text)
    }
}

impl AnalysisClient for GeminiClient {
    fn analyze(&self, request: &AnalysisRequest) -> FeedFuture<'_, MarketAnalysis> {
        let request = request.clone();
        Box::pin(async move {
            let prompt = analysis_prompt(&request);
            let text = self.generate(prompt, analysis_schema()).await?;
            let json = extract_json(&text).ok_or_else(|| {
                FetchError::parse(
                    FeedId::ModelEstimate,
                    "completion does not contain a JSON object",
                )
                .for_symbol(request.symbol.clone())
            })?;

            let wire: AnalysisWire = serde_json::from_str(json).map_err(|e| {
                FetchError::parse(
                    FeedId::ModelEstimate,
                    format!("invalid analysis payload: {e}"),
                )
                .for_symbol(request.symbol.clone())
            })?;

            Ok(wire.into_analysis())
        })
    }

    fn estimate_sentiment(&self, domain: SentimentDomain) -> FeedFuture<'_, i64> {
        Box::pin(async move {
            let prompt = sentiment_prompt(domain);
            let text = self.generate(prompt, sentiment_schema()).await?;
            let json = extract_json(&text).ok_or_else(|| {
                FetchError::parse(
                    FeedId::ModelEstimate,
                    "completion does not contain a JSON object",
                )
            })?;

            let wire: SentimentWire = serde_json::from_str(json).map_err(|e| {
                FetchError::parse(
                    FeedId::ModelEstimate,
                    format!("invalid sentiment payload: {e}"),
                )
            })?;

            Ok(wire.score)
        })
    }
}

fn analysis_prompt(request: &AnalysisRequest) -> String {
    format!(
        "You are a financial analyst. Provide a concise market analysis for \
         the instrument '{}'. Respond in locale '{}'. Include a short summary, \
         a recommendation (Buy, Hold, Sell or Neutral), a detailed analysis, \
         a sentiment score from 0 to 100, and notable support/resistance levels.",
        request.symbol,
        request.locale
    )
}

fn sentiment_prompt(domain: SentimentDomain) -> String {
    format!(
        "Estimate the current overall investor sentiment for the {} market as \
         an integer from 0 (extreme fear) to 100 (extreme greed). Respond with \
         JSON only.",
        domain.as_str()
    )
}

fn analysis_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "summary": {"type": "STRING"},
            "recommendation": {
                "type": "STRING",
                "enum": ["Buy", "Hold", "Sell", "Neutral"],
            },
            "detailedAnalysis": {"type": "STRING"},
            "sentimentScore": {"type": "INTEGER"},
            "keyLevels": {"type": "ARRAY", "items": {"type": "STRING"}},
        },
        "required": ["summary", "recommendation", "detailedAnalysis", "sentimentScore"],
    })
}

fn sentiment_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {"score": {"type": "INTEGER"}},
        "required": ["score"],
    })
}

/// Extracts the outermost JSON object from model output that may be wrapped
/// in prose or code fences.
fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

#[derive(Debug, Deserialize)]
struct GenerateEnvelope {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct AnalysisWire {
    summary: String,
    recommendation: Recommendation,
    #[serde(rename = "detailedAnalysis")]
    detailed_analysis: String,
    #[serde(rename = "sentimentScore")]
    sentiment_score: i64,
    #[serde(rename = "keyLevels", default)]
    key_levels: Vec<String>,
}

impl AnalysisWire {
    fn into_analysis(self) -> MarketAnalysis {
        let score = self.sentiment_score.clamp(0, 100) as u8;
        MarketAnalysis {
            summary: self.summary,
            recommendation: self.recommendation,
            detailed_analysis: self.detailed_analysis,
            sentiment_score: score,
            sentiment_label: SentimentLabel::for_score(score),
            key_levels: self.key_levels,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SentimentWire {
    score: i64,
}
