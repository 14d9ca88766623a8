use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
    time::Duration,
};

use itertools::Itertools;
use metrics::{
    RegistersMetrics,
    prometheus::{IntCounter, Opts, core::Collector},
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::port::{Clock, price::Api};
use crate::{
    Result,
    types::{DateTime, Decimal, PriceEntry, Prices, Utc},
};

pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// An entry is fresh while it is younger than `ttl`. Entries stamped in the
/// future (the clock stepped backwards) count as fresh.
pub fn is_fresh(entry: &PriceEntry, now: DateTime<Utc>, ttl: Duration) -> bool {
    now.signed_duration_since(entry.fetched_at)
        .to_std()
        .map_or(true, |age| age < ttl)
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, PriceEntry>,
    // bumped whenever a provider request completes, successful or not
    attempt: u64,
    last_attempt: HashMap<String, u64>,
}

impl CacheState {
    // last writer wins, judged by `fetched_at`
    fn store(&mut self, entry: PriceEntry) {
        match self.entries.get(&entry.token_id) {
            Some(existing) if existing.fetched_at > entry.fetched_at => {}
            _ => {
                self.entries.insert(entry.token_id.clone(), entry);
            }
        }
    }

    fn record_attempt(&mut self, token_ids: &BTreeSet<String>) {
        self.attempt += 1;
        for token_id in token_ids {
            self.last_attempt.insert(token_id.clone(), self.attempt);
        }
    }

    /// Whether every token in `token_ids` was part of a provider request that
    /// completed after `attempt`.
    fn attempted_since(&self, token_ids: &BTreeSet<String>, attempt: u64) -> bool {
        token_ids.iter().all(|id| {
            self.last_attempt
                .get(id)
                .is_some_and(|&finished| finished > attempt)
        })
    }

    fn fresh_prices(
        &self,
        token_ids: &BTreeSet<String>,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Option<Prices> {
        token_ids
            .iter()
            .map(|id| {
                self.entries
                    .get(id)
                    .filter(|entry| is_fresh(entry, now, ttl))
                    .map(|entry| (id.clone(), entry.usd_price))
            })
            .collect()
    }

    fn last_known_prices(&self, token_ids: &BTreeSet<String>) -> Prices {
        token_ids
            .iter()
            .filter_map(|id| {
                self.entries
                    .get(id)
                    .map(|entry| (id.clone(), entry.usd_price))
            })
            .collect()
    }
}

#[derive(Clone)]
struct Metrics {
    hits: IntCounter,
    misses: IntCounter,
    batch_fetches: IntCounter,
    batch_fetch_failures: IntCounter,
}

impl Default for Metrics {
    fn default() -> Self {
        let counter = |name: &str, help: &str| {
            IntCounter::with_opts(Opts::new(name, help)).expect("metric config to be correct")
        };

        Self {
            hits: counter(
                "price_cache_hits",
                "Lookups fully served from fresh cache entries",
            ),
            misses: counter(
                "price_cache_misses",
                "Lookups that found at least one stale or missing entry",
            ),
            batch_fetches: counter(
                "price_batch_fetches",
                "Batch requests sent to the price provider",
            ),
            batch_fetch_failures: counter(
                "price_batch_fetch_failures",
                "Batch requests to the price provider that failed",
            ),
        }
    }
}

/// Process-wide USD price cache in front of a batch price provider.
///
/// Entries expire after `ttl` but are never evicted: a stale entry is still
/// served when the provider fails. The entry map is only locked for reads and
/// writes, never across provider I/O. Population attempts are serialized by a
/// separate fetch guard so concurrent misses on the same tokens cause a single
/// upstream request. Callers that queued behind a failed request get its
/// fallback instead of retrying.
#[derive(Clone)]
pub struct PriceCache<P, C> {
    price_provider: P,
    clock: C,
    ttl: Duration,
    // preferred over RwLock because of simplicity
    state: Arc<Mutex<CacheState>>,
    fetch_guard: Arc<Mutex<()>>,
    metrics: Metrics,
}

impl<P, C> RegistersMetrics for PriceCache<P, C> {
    fn metrics(&self) -> Vec<Box<dyn Collector>> {
        vec![
            Box::new(self.metrics.hits.clone()),
            Box::new(self.metrics.misses.clone()),
            Box::new(self.metrics.batch_fetches.clone()),
            Box::new(self.metrics.batch_fetch_failures.clone()),
        ]
    }
}

impl<P, C> PriceCache<P, C> {
    pub fn new(price_provider: P, clock: C, ttl: Duration) -> Self {
        Self {
            price_provider,
            clock,
            ttl,
            state: Arc::new(Mutex::new(CacheState::default())),
            fetch_guard: Arc::new(Mutex::new(())),
            metrics: Metrics::default(),
        }
    }

    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    #[cfg(feature = "test-helpers")]
    pub async fn import(&self, entries: impl IntoIterator<Item = PriceEntry>) {
        let mut state = self.state.lock().await;
        entries.into_iter().for_each(|entry| state.store(entry));
    }

    #[cfg(feature = "test-helpers")]
    pub async fn export(&self) -> Vec<PriceEntry> {
        self.state
            .lock()
            .await
            .entries
            .values()
            .cloned()
            .sorted_by(|l, r| l.token_id.cmp(&r.token_id))
            .collect()
    }
}

impl<P, C> PriceCache<P, C>
where
    P: Api + Sync,
    C: Clock + Sync,
{
    /// Prices for `token_ids`. If any of them is stale or missing, the whole
    /// set is refreshed with one provider request. Tokens that can be priced
    /// neither by the provider nor from an earlier (possibly stale) entry are
    /// left out.
    pub async fn get_or_fetch(&self, token_ids: &BTreeSet<String>) -> Prices {
        if token_ids.is_empty() {
            return Prices::default();
        }

        let attempt = {
            let state = self.state.lock().await;
            if let Some(prices) = state.fresh_prices(token_ids, self.clock.now(), self.ttl) {
                debug!("serving {} prices from cache", prices.len());
                self.metrics.hits.inc();
                return prices;
            }
            state.attempt
        };
        self.metrics.misses.inc();

        let _fetch_guard = self.fetch_guard.lock().await;

        {
            let state = self.state.lock().await;
            // someone else may have refreshed these while we waited for the guard
            if let Some(prices) = state.fresh_prices(token_ids, self.clock.now(), self.ttl) {
                debug!("prices refreshed by a concurrent request");
                return prices;
            }

            if state.attempted_since(token_ids, attempt) {
                debug!("a concurrent request already tried these, reusing its outcome");
                return warn_about_unpriced(state.last_known_prices(token_ids), token_ids);
            }
        }

        info!("fetching prices for: {}", token_ids.iter().join(", "));
        self.metrics.batch_fetches.inc();
        let fetched = self.price_provider.prices(token_ids.clone()).await;
        let fetched_at = self.clock.now();

        let mut state = self.state.lock().await;
        state.record_attempt(token_ids);
        match fetched {
            Ok(quotes) => quotes
                .into_iter()
                .filter(|(token_id, _)| token_ids.contains(token_id))
                .for_each(|(token_id, usd_price)| {
                    state.store(PriceEntry {
                        token_id,
                        usd_price,
                        fetched_at,
                    })
                }),
            Err(e) => {
                self.metrics.batch_fetch_failures.inc();
                warn!("price fetch failed, falling back to last known prices: {e}");
            }
        }

        let prices = state.last_known_prices(token_ids);
        drop(state);

        warn_about_unpriced(prices, token_ids)
    }

    /// Single-token lookup sharing the store with [`Self::get_or_fetch`].
    pub async fn get_or_fetch_one(&self, token_id: &str) -> Result<Decimal> {
        let token_ids = BTreeSet::from([token_id.to_string()]);
        self.get_or_fetch(&token_ids).await.get(token_id)
    }
}

fn warn_about_unpriced(prices: Prices, token_ids: &BTreeSet<String>) -> Prices {
    if prices.len() < token_ids.len() {
        let unpriced = token_ids
            .iter()
            .filter(|id| prices.get(id).is_err())
            .join(", ");
        warn!("no price available for: {unpriced}");
    }

    prices
}
