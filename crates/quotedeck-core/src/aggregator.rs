//! Quote table aggregation across price and sentiment feeds.
//!
//! The aggregator owns the only mutable copy of the quote table. Refresh
//! cycles fan out per symbol, merge results as they land, and publish one
//! immutable snapshot per cycle over a watch channel. Upstream failures
//! never remove data: a symbol that fails to refresh keeps its previous
//! quote, and a sentiment domain that fails keeps its previous index.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::classify::{classify, AssetClass};
use crate::domain::{MarketState, Quote, SentimentDomain, SentimentIndex, Symbol, UtcDateTime};
use crate::feed::{FetchError, PriceFeed, PriceSnapshot, SentimentFeed};
use crate::market_clock::MarketCalendar;
use crate::sentiment_cache::SentimentCache;

/// Immutable view of the aggregated table, published once per change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeckSnapshot {
    pub quotes: BTreeMap<Symbol, Quote>,
    pub sentiment: HashMap<SentimentDomain, SentimentIndex>,
}

#[derive(Debug, Clone)]
struct QuoteEntry {
    quote: Quote,
    last_cycle: u64,
}

#[derive(Default)]
struct TableState {
    quotes: HashMap<Symbol, QuoteEntry>,
    sentiment: HashMap<SentimentDomain, SentimentIndex>,
}

impl TableState {
    fn snapshot(&self) -> DeckSnapshot {
        DeckSnapshot {
            quotes: self
                .quotes
                .iter()
                .map(|(symbol, entry)| (symbol.clone(), entry.quote.clone()))
                .collect(),
            sentiment: self.sentiment.clone(),
        }
    }
}

/// Multi-feed aggregator maintaining one quote table and per-domain
/// sentiment indices.
pub struct Aggregator {
    crypto_feed: Arc<dyn PriceFeed>,
    equity_feed: Arc<dyn PriceFeed>,
    crypto_sentiment: Arc<dyn SentimentFeed>,
    equity_sentiment: Arc<dyn SentimentFeed>,
    calendar: MarketCalendar,
    cache: Option<SentimentCache>,
    state: Mutex<TableState>,
    cycle: AtomicU64,
    closed: AtomicBool,
    publisher: watch::Sender<Arc<DeckSnapshot>>,
}

impl Aggregator {
    pub fn new(
        crypto_feed: Arc<dyn PriceFeed>,
        equity_feed: Arc<dyn PriceFeed>,
        crypto_sentiment: Arc<dyn SentimentFeed>,
        equity_sentiment: Arc<dyn SentimentFeed>,
    ) -> Self {
        let (publisher, _) = watch::channel(Arc::new(DeckSnapshot::default()));
        Self {
            crypto_feed,
            equity_feed,
            crypto_sentiment,
            equity_sentiment,
            calendar: MarketCalendar::default(),
            cache: None,
            state: Mutex::new(TableState::default()),
            cycle: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            publisher,
        }
    }

    pub fn with_calendar(mut self, calendar: MarketCalendar) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn with_cache(mut self, cache: SentimentCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Seeds sentiment from the cache so the table has values before the
    /// first upstream round-trip completes.
    pub fn warm_from_cache(&self) {
        let Some(cache) = &self.cache else {
            return;
        };

        let mut changed = false;
        {
            let mut state = self.state.lock().expect("table state not poisoned");
            for domain in SentimentDomain::ALL {
                if let Some(index) = cache.load(domain) {
                    state.sentiment.insert(domain, index);
                    changed = true;
                }
            }
        }
        if changed {
            self.publish();
        }
    }

    /// Runs one full price refresh cycle over the given symbols.
    ///
    /// Fetches fan out concurrently; results merge as they land. A merge is
    /// discarded when a newer cycle already wrote the symbol or when the
    /// aggregator has been closed, so a slow old cycle can never clobber a
    /// fresh quote.
    pub async fn refresh(&self, symbols: &[Symbol]) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }

        let cycle = self.cycle.fetch_add(1, Ordering::SeqCst) + 1;
        let market_open = self.calendar.is_open(UtcDateTime::now());

        let mut tasks: JoinSet<(Symbol, AssetClass, Result<PriceSnapshot, FetchError>)> =
            JoinSet::new();
        for symbol in symbols {
            let symbol = symbol.clone();
            let class = classify(symbol.as_str());
            let feed = match class {
                AssetClass::Crypto => Arc::clone(&self.crypto_feed),
                AssetClass::Equity => Arc::clone(&self.equity_feed),
            };
            tasks.spawn(async move {
                let result = feed.fetch(&symbol).await;
                (symbol, class, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let Ok((symbol, class, result)) = joined else {
                continue;
            };
            match result {
                Ok(snapshot) => self.merge_quote(cycle, symbol, class, market_open, snapshot),
                Err(error) => {
                    let retained_age_secs = {
                        let state = self.state.lock().expect("table state not poisoned");
                        state
                            .quotes
                            .get(&symbol)
                            .map(|entry| entry.quote.as_of.age(UtcDateTime::now()).whole_seconds())
                    };
                    tracing::warn!(
                        feed = %error.feed(),
                        symbol = symbol.as_str(),
                        code = error.code(),
                        retryable = error.retryable(),
                        retained_age_secs,
                        "price refresh failed, keeping previous quote: {}",
                        error.message()
                    );
                }
            }
        }

        self.publish();
    }

    fn merge_quote(
        &self,
        cycle: u64,
        symbol: Symbol,
        class: AssetClass,
        market_open: bool,
        snapshot: PriceSnapshot,
    ) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }

        // Outside trading hours an equity chart still reports the last
        // session; the table shows that price with movement zeroed out.
        let (change_percent, market_state) = match class {
            AssetClass::Equity if !market_open => (0.0, MarketState::ClosedUsingLastClose),
            _ => (snapshot.change_percent, MarketState::Open),
        };

        let quote = match Quote::new(
            symbol.clone(),
            snapshot.price,
            change_percent,
            UtcDateTime::now(),
            market_state,
        ) {
            Ok(quote) => quote,
            Err(error) => {
                tracing::warn!(
                    symbol = symbol.as_str(),
                    "discarding unusable snapshot: {error}"
                );
                return;
            }
        };

        let mut state = self.state.lock().expect("table state not poisoned");
        match state.quotes.get(&symbol) {
            Some(entry) if entry.last_cycle > cycle => {
                tracing::debug!(
                    symbol = symbol.as_str(),
                    stale_cycle = cycle,
                    current_cycle = entry.last_cycle,
                    "discarding stale merge"
                );
            }
            _ => {
                state.quotes.insert(
                    symbol,
                    QuoteEntry {
                        quote,
                        last_cycle: cycle,
                    },
                );
            }
        }
    }

    /// Refreshes the sentiment index for one domain and writes it through
    /// to the cache on success.
    pub async fn refresh_sentiment(&self, domain: SentimentDomain) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }

        let feed = match domain {
            SentimentDomain::Crypto => Arc::clone(&self.crypto_sentiment),
            SentimentDomain::Equities => Arc::clone(&self.equity_sentiment),
        };

        match feed.fetch(domain).await {
            Ok(index) => {
                if self.closed.load(Ordering::SeqCst) {
                    return;
                }
                if let Some(cache) = &self.cache {
                    cache.save(&index);
                }
                self.state
                    .lock()
                    .expect("table state not poisoned")
                    .sentiment
                    .insert(domain, index);
                self.publish();
            }
            Err(error) => {
                tracing::warn!(
                    feed = %error.feed(),
                    domain = domain.as_str(),
                    code = error.code(),
                    "sentiment refresh failed, keeping previous index: {}",
                    error.message()
                );
            }
        }
    }

    /// Drops quotes for symbols no longer tracked.
    pub fn retain(&self, keep: &HashSet<Symbol>) {
        let removed = {
            let mut state = self.state.lock().expect("table state not poisoned");
            let before = state.quotes.len();
            state.quotes.retain(|symbol, _| keep.contains(symbol));
            before - state.quotes.len()
        };
        if removed > 0 {
            self.publish();
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<DeckSnapshot>> {
        self.publisher.subscribe()
    }

    pub fn snapshot(&self) -> Arc<DeckSnapshot> {
        self.publisher.borrow().clone()
    }

    /// Stops accepting merges. In-flight cycles finish but write nothing.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn publish(&self) {
        let snapshot = {
            let state = self.state.lock().expect("table state not poisoned");
            Arc::new(state.snapshot())
        };
        // send_replace keeps the latest value even with no subscribers.
        let _ = self.publisher.send_replace(snapshot);
    }
}
