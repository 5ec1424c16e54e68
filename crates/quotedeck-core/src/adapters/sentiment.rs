use std::sync::Arc;

use crate::analysis::AnalysisClient;
use crate::domain::{SentimentDomain, SentimentIndex, SentimentOrigin};
use crate::feed::{FeedFuture, FeedId, SentimentFeed};

/// Sentiment adapter that asks the analysis backend for a score estimate.
#[derive(Clone)]
pub struct ModelSentiment {
    client: Arc<dyn AnalysisClient>,
}

impl ModelSentiment {
    pub fn new(client: Arc<dyn AnalysisClient>) -> Self {
        Self { client }
    }
}

impl SentimentFeed for ModelSentiment {
    fn id(&self) -> FeedId {
        FeedId::ModelEstimate
    }

    fn fetch(&self, domain: SentimentDomain) -> FeedFuture<'_, SentimentIndex> {
        Box::pin(async move {
            let raw_score = self.client.estimate_sentiment(domain).await?;
            Ok(SentimentIndex::from_raw(
                domain,
                raw_score,
                SentimentOrigin::ModelEstimate,
            ))
        })
    }
}

/// Terminal fallback that always reports a neutral index.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticSentiment;

impl SentimentFeed for StaticSentiment {
    fn id(&self) -> FeedId {
        FeedId::ModelEstimate
    }

    fn fetch(&self, domain: SentimentDomain) -> FeedFuture<'_, SentimentIndex> {
        Box::pin(async move { Ok(SentimentIndex::neutral_fallback(domain)) })
    }
}

/// Tries a primary sentiment feed and falls back on any failure.
///
/// The primary's error is logged and swallowed; the fallback's own error,
/// if any, is the one callers see.
pub struct FallbackSentiment {
    primary: Arc<dyn SentimentFeed>,
    fallback: Arc<dyn SentimentFeed>,
}

impl FallbackSentiment {
    pub fn new(primary: Arc<dyn SentimentFeed>, fallback: Arc<dyn SentimentFeed>) -> Self {
        Self { primary, fallback }
    }
}

impl SentimentFeed for FallbackSentiment {
    fn id(&self) -> FeedId {
        self.primary.id()
    }

    fn fetch(&self, domain: SentimentDomain) -> FeedFuture<'_, SentimentIndex> {
        Box::pin(async move {
            match self.primary.fetch(domain).await {
                Ok(index) => Ok(index),
                Err(error) => {
                    tracing::warn!(
                        feed = %error.feed(),
                        domain = domain.as_str(),
                        code = error.code(),
                        "primary sentiment feed failed: {}",
                        error.message()
                    );
                    self.fallback.fetch(domain).await
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SentimentLabel;
    use crate::feed::FetchError;

    struct FailingFeed;

    impl SentimentFeed for FailingFeed {
        fn id(&self) -> FeedId {
            FeedId::ModelEstimate
        }

        fn fetch(&self, _domain: SentimentDomain) -> FeedFuture<'_, SentimentIndex> {
            Box::pin(async move {
                Err(FetchError::model_unavailable(
                    FeedId::ModelEstimate,
                    "backend offline",
                ))
            })
        }
    }

    #[tokio::test]
    async fn static_fallback_is_neutral() {
        let index = StaticSentiment
            .fetch(SentimentDomain::Equities)
            .await
            .expect("static index");
        assert_eq!(index.score, 50);
        assert_eq!(index.label, SentimentLabel::Neutral);
        assert_eq!(index.origin, SentimentOrigin::StaticFallback);
    }

    #[tokio::test]
    async fn fallback_engages_when_primary_fails() {
        let ladder = FallbackSentiment::new(Arc::new(FailingFeed), Arc::new(StaticSentiment));

        let index = ladder
            .fetch(SentimentDomain::Equities)
            .await
            .expect("fallback index");
        assert_eq!(index.origin, SentimentOrigin::StaticFallback);
    }
}
