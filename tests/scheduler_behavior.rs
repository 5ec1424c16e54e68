//! Behavior tests for the periodic refresh scheduler.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use quotedeck_tests::{
    crypto_index, equity_index, symbol, Aggregator, FeedId, MarketCalendar, PriceStep,
    ScriptedPriceFeed, ScriptedSentimentFeed, SentimentDomain, Symbol,
};

use quotedeck_core::scheduler::{RefreshConfig, RefreshScheduler};

fn slow_cadence() -> RefreshConfig {
    // Long enough that only the immediate first tick runs during a test.
    RefreshConfig {
        quote_interval: Duration::from_secs(600),
        sentiment_interval: Duration::from_secs(600),
        jitter: 0.0,
    }
}

fn build() -> (Arc<Aggregator>, Arc<ScriptedPriceFeed>) {
    let crypto = Arc::new(
        ScriptedPriceFeed::new(FeedId::Binance).script("BTCUSDT", PriceStep::Ok(65_000.0, 2.1)),
    );
    let agg = Arc::new(
        Aggregator::new(
            Arc::clone(&crypto) as Arc<dyn quotedeck_core::PriceFeed>,
            Arc::new(ScriptedPriceFeed::new(FeedId::EquityChart)),
            Arc::new(ScriptedSentimentFeed::new(FeedId::FearGreed).ok(crypto_index(72))),
            Arc::new(ScriptedSentimentFeed::new(FeedId::ModelEstimate).ok(equity_index(44))),
        )
        .with_calendar(MarketCalendar::always_open()),
    );
    (agg, crypto)
}

async fn wait_until(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn first_tick_runs_immediately() {
    let (agg, crypto) = build();
    let scheduler = RefreshScheduler::start(Arc::clone(&agg), slow_cadence(), || {
        vec![symbol("BTCUSDT")]
    });

    let refreshed = wait_until(|| crypto.call_count() >= 1).await;
    assert!(refreshed, "first price tick should not wait an interval");

    let populated = wait_until(|| agg.snapshot().quotes.contains_key(&symbol("BTCUSDT"))).await;
    assert!(populated);

    let sentiment = wait_until(|| agg.snapshot().sentiment.len() == 2).await;
    assert!(sentiment, "both sentiment domains refresh on the first tick");
    assert_eq!(agg.snapshot().sentiment[&SentimentDomain::Crypto].score, 72);

    scheduler.stop();
}

#[tokio::test]
async fn stop_is_synchronous_and_idempotent() {
    let (agg, _crypto) = build();
    let scheduler = RefreshScheduler::start(Arc::clone(&agg), slow_cadence(), || {
        vec![symbol("BTCUSDT")]
    });

    scheduler.stop();
    assert!(scheduler.is_stopped());

    // A second stop is a no-op, not a panic or a double-abort hazard.
    scheduler.stop();
    assert!(scheduler.is_stopped());
}

#[tokio::test]
async fn stopped_scheduler_issues_no_more_fetches() {
    let (agg, crypto) = build();
    let config = RefreshConfig {
        quote_interval: Duration::from_millis(10),
        sentiment_interval: Duration::from_secs(600),
        jitter: 0.0,
    };
    let scheduler = RefreshScheduler::start(Arc::clone(&agg), config, || {
        vec![symbol("BTCUSDT")]
    });

    assert!(wait_until(|| crypto.call_count() >= 2).await);
    scheduler.stop();

    let after_stop = crypto.call_count();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(crypto.call_count(), after_stop);
}

#[tokio::test]
async fn watchlist_edits_apply_on_the_next_tick() {
    let crypto = Arc::new(
        ScriptedPriceFeed::new(FeedId::Binance)
            .script("BTCUSDT", PriceStep::Ok(65_000.0, 2.1))
            .script("ETHUSDT", PriceStep::Ok(3_200.0, -0.4)),
    );
    let agg = Arc::new(
        Aggregator::new(
            Arc::clone(&crypto) as Arc<dyn quotedeck_core::PriceFeed>,
            Arc::new(ScriptedPriceFeed::new(FeedId::EquityChart)),
            Arc::new(ScriptedSentimentFeed::new(FeedId::FearGreed).ok(crypto_index(50))),
            Arc::new(ScriptedSentimentFeed::new(FeedId::ModelEstimate).ok(equity_index(50))),
        )
        .with_calendar(MarketCalendar::always_open()),
    );

    let tracked: Arc<Mutex<Vec<Symbol>>> = Arc::new(Mutex::new(vec![symbol("BTCUSDT")]));
    let config = RefreshConfig {
        quote_interval: Duration::from_millis(10),
        sentiment_interval: Duration::from_secs(600),
        jitter: 0.0,
    };
    let scheduler = {
        let tracked = Arc::clone(&tracked);
        RefreshScheduler::start(Arc::clone(&agg), config, move || {
            tracked.lock().expect("tracked list not poisoned").clone()
        })
    };

    assert!(wait_until(|| agg.snapshot().quotes.contains_key(&symbol("BTCUSDT"))).await);

    tracked
        .lock()
        .expect("tracked list not poisoned")
        .push(symbol("ETHUSDT"));

    let picked_up = wait_until(|| agg.snapshot().quotes.contains_key(&symbol("ETHUSDT"))).await;
    assert!(picked_up, "new symbol should be fetched without a restart");

    scheduler.stop();
}
