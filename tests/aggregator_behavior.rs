//! Behavior tests for quote table aggregation.
//!
//! These tests verify how the aggregator merges heterogeneous feeds:
//! routing by asset class, market-hours gating, retain-on-failure, and
//! the cycle guard that keeps slow old refreshes from clobbering new data.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Notify;

use quotedeck_tests::{
    crypto_index, equity_index, symbol, Aggregator, FeedId, MarketCalendar, MarketState,
    PriceStep, ScriptedPriceFeed, ScriptedSentimentFeed,
};

fn aggregator(
    crypto: ScriptedPriceFeed,
    equity: ScriptedPriceFeed,
    calendar: MarketCalendar,
) -> Aggregator {
    Aggregator::new(
        Arc::new(crypto),
        Arc::new(equity),
        Arc::new(ScriptedSentimentFeed::new(FeedId::FearGreed).ok(crypto_index(50))),
        Arc::new(ScriptedSentimentFeed::new(FeedId::ModelEstimate).ok(equity_index(50))),
    )
    .with_calendar(calendar)
}

// =============================================================================
// Routing and merge
// =============================================================================

#[tokio::test]
async fn crypto_and_equity_quotes_land_in_one_table() {
    let crypto = ScriptedPriceFeed::new(FeedId::Binance)
        .script("BTCUSDT", PriceStep::Ok(65_000.0, 2.1));
    let equity = ScriptedPriceFeed::new(FeedId::EquityChart)
        .script("AAPL", PriceStep::Ok(180.0, 1.1235955056179776));
    let agg = aggregator(crypto, equity, MarketCalendar::always_open());

    agg.refresh(&[symbol("BTCUSDT"), symbol("AAPL")]).await;

    let snapshot = agg.snapshot();
    assert_eq!(snapshot.quotes.len(), 2);

    let btc = &snapshot.quotes[&symbol("BTCUSDT")];
    assert_eq!(btc.price, 65_000.0);
    assert_eq!(btc.change_percent, 2.1);
    assert_eq!(btc.market_state, MarketState::Open);

    let aapl = &snapshot.quotes[&symbol("AAPL")];
    assert_eq!(aapl.price, 180.0);
    assert!((aapl.change_percent - 1.1235955056179776).abs() < 1e-12);
    assert_eq!(aapl.market_state, MarketState::Open);
}

#[tokio::test]
async fn merging_identical_data_twice_equals_merging_it_once() {
    let crypto = ScriptedPriceFeed::new(FeedId::Binance)
        .script("BTCUSDT", PriceStep::Ok(65_000.0, 2.1))
        .script("BTCUSDT", PriceStep::Ok(65_000.0, 2.1));
    let equity = ScriptedPriceFeed::new(FeedId::EquityChart);
    let agg = aggregator(crypto, equity, MarketCalendar::always_open());

    agg.refresh(&[symbol("BTCUSDT")]).await;
    let first = agg.snapshot().quotes[&symbol("BTCUSDT")].clone();

    agg.refresh(&[symbol("BTCUSDT")]).await;
    let second = agg.snapshot().quotes[&symbol("BTCUSDT")].clone();

    // Only `as_of` may move between the two merges.
    assert_eq!(second.symbol, first.symbol);
    assert_eq!(second.price, first.price);
    assert_eq!(second.change_percent, first.change_percent);
    assert_eq!(second.market_state, first.market_state);
    assert_eq!(agg.snapshot().quotes.len(), 1);
}

#[tokio::test]
async fn bare_quote_asset_routes_to_the_equity_feed() {
    // "BTC" with no quote suffix is not a crypto pair; it routes like a
    // stock ticker.
    let crypto = ScriptedPriceFeed::new(FeedId::Binance);
    let equity =
        ScriptedPriceFeed::new(FeedId::EquityChart).script("BTC", PriceStep::Ok(12.0, 0.5));
    let agg = aggregator(crypto, equity, MarketCalendar::always_open());

    agg.refresh(&[symbol("BTC")]).await;

    let snapshot = agg.snapshot();
    assert_eq!(snapshot.quotes[&symbol("BTC")].price, 12.0);
}

// =============================================================================
// Market-hours gating
// =============================================================================

#[tokio::test]
async fn closed_market_shows_last_close_with_zero_change() {
    let crypto = ScriptedPriceFeed::new(FeedId::Binance)
        .script("BTCUSDT", PriceStep::Ok(65_000.0, 2.1));
    let equity =
        ScriptedPriceFeed::new(FeedId::EquityChart).script("AAPL", PriceStep::Ok(180.0, 1.12));
    let agg = aggregator(crypto, equity, MarketCalendar::always_closed());

    agg.refresh(&[symbol("BTCUSDT"), symbol("AAPL")]).await;

    let snapshot = agg.snapshot();
    let aapl = &snapshot.quotes[&symbol("AAPL")];
    assert_eq!(aapl.price, 180.0);
    assert_eq!(aapl.change_percent, 0.0);
    assert_eq!(aapl.market_state, MarketState::ClosedUsingLastClose);

    // Crypto trades around the clock; the gate never applies.
    let btc = &snapshot.quotes[&symbol("BTCUSDT")];
    assert_eq!(btc.change_percent, 2.1);
    assert_eq!(btc.market_state, MarketState::Open);
}

// =============================================================================
// Retain on failure
// =============================================================================

#[tokio::test]
async fn failed_refresh_keeps_the_previous_quote() {
    let crypto = ScriptedPriceFeed::new(FeedId::Binance)
        .script("BTCUSDT", PriceStep::Ok(65_000.0, 2.1))
        .script("BTCUSDT", PriceStep::Fail("connection refused"));
    let equity = ScriptedPriceFeed::new(FeedId::EquityChart);
    let agg = aggregator(crypto, equity, MarketCalendar::always_open());

    agg.refresh(&[symbol("BTCUSDT")]).await;
    agg.refresh(&[symbol("BTCUSDT")]).await;

    let snapshot = agg.snapshot();
    let btc = &snapshot.quotes[&symbol("BTCUSDT")];
    assert_eq!(btc.price, 65_000.0);
    assert_eq!(btc.change_percent, 2.1);
}

#[tokio::test]
async fn never_fetched_symbol_is_absent_not_zeroed() {
    let crypto =
        ScriptedPriceFeed::new(FeedId::Binance).script("BTCUSDT", PriceStep::Fail("down"));
    let equity = ScriptedPriceFeed::new(FeedId::EquityChart);
    let agg = aggregator(crypto, equity, MarketCalendar::always_open());

    agg.refresh(&[symbol("BTCUSDT")]).await;

    assert!(agg.snapshot().quotes.is_empty());
}

// =============================================================================
// Cycle guard
// =============================================================================

#[tokio::test]
async fn stale_cycle_merge_is_discarded() {
    let gate = Arc::new(Notify::new());
    let crypto = ScriptedPriceFeed::new(FeedId::Binance)
        .script("BTCUSDT", PriceStep::Gated(Arc::clone(&gate), 64_000.0, 1.0))
        .script("BTCUSDT", PriceStep::Ok(65_000.0, 2.1));
    let equity = ScriptedPriceFeed::new(FeedId::EquityChart);
    let agg = Arc::new(aggregator(crypto, equity, MarketCalendar::always_open()));

    // Cycle 1 starts first and stalls inside its fetch.
    let slow = {
        let agg = Arc::clone(&agg);
        tokio::spawn(async move { agg.refresh(&[symbol("BTCUSDT")]).await })
    };
    tokio::task::yield_now().await;

    // Cycle 2 completes while cycle 1 is still in flight.
    agg.refresh(&[symbol("BTCUSDT")]).await;
    assert_eq!(agg.snapshot().quotes[&symbol("BTCUSDT")].price, 65_000.0);

    // Cycle 1 finally answers with the older price; it must not win.
    gate.notify_one();
    slow.await.expect("slow cycle completes");

    let btc = &agg.snapshot().quotes[&symbol("BTCUSDT")];
    assert_eq!(btc.price, 65_000.0);
    assert_eq!(btc.change_percent, 2.1);
}

#[tokio::test]
async fn closed_aggregator_ignores_refreshes() {
    let crypto = ScriptedPriceFeed::new(FeedId::Binance)
        .script("BTCUSDT", PriceStep::Ok(65_000.0, 2.1));
    let equity = ScriptedPriceFeed::new(FeedId::EquityChart);
    let agg = aggregator(crypto, equity, MarketCalendar::always_open());

    agg.close();
    assert!(agg.is_closed());

    agg.refresh(&[symbol("BTCUSDT")]).await;
    assert!(agg.snapshot().quotes.is_empty());
}

// =============================================================================
// Watchlist maintenance and publishing
// =============================================================================

#[tokio::test]
async fn retain_drops_untracked_symbols() {
    let crypto = ScriptedPriceFeed::new(FeedId::Binance)
        .script("BTCUSDT", PriceStep::Ok(65_000.0, 2.1))
        .script("ETHUSDT", PriceStep::Ok(3_200.0, -0.4));
    let equity = ScriptedPriceFeed::new(FeedId::EquityChart);
    let agg = aggregator(crypto, equity, MarketCalendar::always_open());

    agg.refresh(&[symbol("BTCUSDT"), symbol("ETHUSDT")]).await;
    assert_eq!(agg.snapshot().quotes.len(), 2);

    let keep: HashSet<_> = [symbol("ETHUSDT")].into_iter().collect();
    agg.retain(&keep);

    let snapshot = agg.snapshot();
    assert_eq!(snapshot.quotes.len(), 1);
    assert!(snapshot.quotes.contains_key(&symbol("ETHUSDT")));
}

#[tokio::test]
async fn subscribers_see_each_published_snapshot() {
    let crypto = ScriptedPriceFeed::new(FeedId::Binance)
        .script("BTCUSDT", PriceStep::Ok(65_000.0, 2.1));
    let equity = ScriptedPriceFeed::new(FeedId::EquityChart);
    let agg = aggregator(crypto, equity, MarketCalendar::always_open());

    let mut updates = agg.subscribe();
    agg.refresh(&[symbol("BTCUSDT")]).await;

    updates.changed().await.expect("publisher alive");
    let snapshot = updates.borrow().clone();
    assert_eq!(snapshot.quotes[&symbol("BTCUSDT")].price, 65_000.0);
}
