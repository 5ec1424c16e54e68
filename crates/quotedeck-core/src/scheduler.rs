//! Periodic refresh driver for the aggregator.
//!
//! Two independent cadences: a fast one for prices and a slow one for
//! sentiment. Each tick's sleep carries random jitter so restarted
//! instances do not hammer upstreams in lockstep.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::aggregator::Aggregator;
use crate::domain::{SentimentDomain, Symbol};

/// Cadence configuration for the scheduler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefreshConfig {
    pub quote_interval: Duration,
    pub sentiment_interval: Duration,
    /// Fractional jitter applied to every sleep, e.g. `0.1` for +/- 10%.
    pub jitter: f64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            quote_interval: Duration::from_secs(15),
            sentiment_interval: Duration::from_secs(3600),
            jitter: 0.1,
        }
    }
}

/// Applies random jitter of +/- `fraction` to an interval.
fn jittered(interval: Duration, fraction: f64) -> Duration {
    let fraction = fraction.clamp(0.0, 1.0);
    if fraction == 0.0 {
        return interval;
    }
    let jitter_ms = (interval.as_millis() as f64 * fraction) as u64;
    let random_offset = fastrand::u64(0..=(jitter_ms * 2));
    let total_ms = interval.as_millis() as i64 + (random_offset as i64 - jitter_ms as i64);
    Duration::from_millis(total_ms.max(0) as u64)
}

/// Drives periodic price and sentiment refreshes until stopped.
///
/// `stop` is synchronous and idempotent. Cycles already in flight when it
/// is called are abandoned; the aggregator's merge guards make sure they
/// write nothing.
pub struct RefreshScheduler {
    stopped: Arc<AtomicBool>,
    price_task: JoinHandle<()>,
    sentiment_task: JoinHandle<()>,
}

impl RefreshScheduler {
    /// Spawns both refresh loops. The `symbols` closure is consulted at
    /// the start of every price tick, so watchlist edits take effect on
    /// the next cycle without restarting the scheduler.
    pub fn start(
        aggregator: Arc<Aggregator>,
        config: RefreshConfig,
        symbols: impl Fn() -> Vec<Symbol> + Send + Sync + 'static,
    ) -> Self {
        let stopped = Arc::new(AtomicBool::new(false));

        let price_task = {
            let aggregator = Arc::clone(&aggregator);
            let stopped = Arc::clone(&stopped);
            tokio::spawn(async move {
                loop {
                    if stopped.load(Ordering::SeqCst) {
                        break;
                    }
                    let tracked = symbols();
                    if !tracked.is_empty() {
                        aggregator.refresh(&tracked).await;
                    }
                    tokio::time::sleep(jittered(config.quote_interval, config.jitter)).await;
                }
            })
        };

        let sentiment_task = {
            let aggregator = Arc::clone(&aggregator);
            let stopped = Arc::clone(&stopped);
            tokio::spawn(async move {
                loop {
                    if stopped.load(Ordering::SeqCst) {
                        break;
                    }
                    for domain in SentimentDomain::ALL {
                        aggregator.refresh_sentiment(domain).await;
                    }
                    tokio::time::sleep(jittered(config.sentiment_interval, config.jitter)).await;
                }
            })
        };

        Self {
            stopped,
            price_task,
            sentiment_task,
        }
    }

    /// Stops both loops. Safe to call more than once.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        self.price_task.abort();
        self.sentiment_task.abort();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
