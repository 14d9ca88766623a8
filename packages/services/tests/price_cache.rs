use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
    time::Duration,
};

use clock::TestClock;
use mockall::predicate::eq;
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use services::{
    Error, PriceCache,
    price_cache::{
        port::price::{MockApi, testing::RecordingPriceApi},
        service::{DEFAULT_TTL, is_fresh},
    },
    types::{Decimal, PriceEntry},
};
use test_case::test_case;

fn ids(ids: &[&str]) -> BTreeSet<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

fn quotes(quotes: &[(&str, Decimal)]) -> BTreeMap<String, Decimal> {
    quotes
        .iter()
        .map(|(id, price)| (id.to_string(), *price))
        .collect()
}

#[test_case(0, true; "just fetched")]
#[test_case(299, true; "one second before expiry")]
#[test_case(300, false; "exactly at ttl")]
#[test_case(301, false; "past ttl")]
fn freshness_depends_on_age(age_secs: u64, expected: bool) {
    // given
    let clock = TestClock::default();
    let entry = PriceEntry {
        token_id: "cosmos".to_string(),
        usd_price: dec!(4.2),
        fetched_at: clock.now(),
    };
    clock.advance_time(Duration::from_secs(age_secs));

    // when
    let fresh = is_fresh(&entry, clock.now(), DEFAULT_TTL);

    // then
    assert_eq!(fresh, expected);
}

#[test]
fn entry_from_the_future_is_fresh() {
    let clock = TestClock::default();
    let entry = PriceEntry {
        token_id: "cosmos".to_string(),
        usd_price: dec!(4.2),
        fetched_at: clock.now() + Duration::from_secs(10),
    };

    assert!(is_fresh(&entry, clock.now(), DEFAULT_TTL));
}

#[tokio::test]
async fn fresh_entries_are_served_without_upstream_calls() {
    // given
    let mut provider = MockApi::new();
    provider
        .expect_prices()
        .with(eq(ids(&["cosmos", "osmosis"])))
        .once()
        .returning(|_| {
            Box::pin(async {
                Ok(quotes(&[("cosmos", dec!(4.2)), ("osmosis", dec!(0.5))]))
            })
        });
    let clock = TestClock::default();
    let cache = PriceCache::new(provider, clock.clone(), DEFAULT_TTL);
    let first = cache.get_or_fetch(&ids(&["cosmos", "osmosis"])).await;
    clock.advance_time(Duration::from_secs(299));

    // when
    let second = cache.get_or_fetch(&ids(&["cosmos", "osmosis"])).await;

    // then
    assert_eq!(first, second);
    assert_eq!(second.get("osmosis"), Ok(dec!(0.5)));
}

#[tokio::test]
async fn any_stale_entry_refreshes_the_whole_requested_set() {
    // given
    let provider = RecordingPriceApi::new([("cosmos", dec!(4.2))]);
    let clock = TestClock::default();
    let cache = PriceCache::new(provider.clone(), clock.clone(), DEFAULT_TTL);
    cache.get_or_fetch_one("cosmos").await.unwrap();

    clock.advance_time(Duration::from_secs(200));
    provider.set_price("osmosis", dec!(0.5));
    provider.set_price("cosmos", dec!(4.3));

    // when
    let prices = cache.get_or_fetch(&ids(&["cosmos", "osmosis"])).await;

    // then
    assert_eq!(
        provider.requests(),
        vec![ids(&["cosmos"]), ids(&["cosmos", "osmosis"])]
    );
    assert_eq!(prices.get("cosmos"), Ok(dec!(4.3)));
    let refreshed_at = clock.now();
    assert!(
        cache
            .export()
            .await
            .iter()
            .all(|entry| entry.fetched_at == refreshed_at)
    );
}

#[tokio::test]
async fn single_key_lookup_reuses_batch_entries() {
    // given
    let provider =
        RecordingPriceApi::new([("cosmos", dec!(4.2)), ("juno-network", dec!(0.1))]);
    let cache = PriceCache::new(provider.clone(), TestClock::default(), DEFAULT_TTL);
    cache.get_or_fetch(&ids(&["cosmos", "juno-network"])).await;

    // when
    let price = cache.get_or_fetch_one("juno-network").await;

    // then
    assert_eq!(price, Ok(dec!(0.1)));
    assert_eq!(provider.request_count(), 1);
}

#[tokio::test]
async fn expired_entries_are_refetched_once() {
    // given
    let provider = RecordingPriceApi::new([("cosmos", dec!(4.2))]);
    let clock = TestClock::default();
    let cache = PriceCache::new(provider.clone(), clock.clone(), DEFAULT_TTL);
    cache.get_or_fetch_one("cosmos").await.unwrap();
    clock.advance_time(DEFAULT_TTL);

    // when
    cache.get_or_fetch_one("cosmos").await.unwrap();
    cache.get_or_fetch_one("cosmos").await.unwrap();

    // then
    assert_eq!(provider.request_count(), 2);
}

#[tokio::test]
async fn stale_value_is_served_when_upstream_fails() {
    // given
    let provider = RecordingPriceApi::new([("cosmos", dec!(4.2))]);
    let clock = TestClock::default();
    let cache = PriceCache::new(provider.clone(), clock.clone(), DEFAULT_TTL);
    cache.get_or_fetch_one("cosmos").await.unwrap();

    clock.advance_time(Duration::from_secs(3600));
    provider.set_failing(true);

    // when
    let price = cache.get_or_fetch_one("cosmos").await;

    // then
    assert_eq!(price, Ok(dec!(4.2)));
    assert_eq!(provider.request_count(), 2);
}

#[tokio::test]
async fn failure_only_affects_tokens_without_any_value() {
    // given
    let clock = TestClock::default();
    let provider = RecordingPriceApi::default();
    provider.set_failing(true);
    let cache = PriceCache::new(provider, clock.clone(), DEFAULT_TTL);
    cache
        .import([PriceEntry {
            token_id: "cosmos".to_string(),
            usd_price: dec!(4.2),
            fetched_at: clock.now() - Duration::from_secs(3600),
        }])
        .await;

    // when
    let prices = cache.get_or_fetch(&ids(&["cosmos", "osmosis"])).await;

    // then
    assert_eq!(prices.get("cosmos"), Ok(dec!(4.2)));
    assert_eq!(
        prices.get("osmosis"),
        Err(Error::PriceUnavailable("osmosis".to_string()))
    );
}

#[tokio::test]
async fn token_missing_from_response_falls_back_to_last_known_value() {
    // given
    let clock = TestClock::default();
    let provider = RecordingPriceApi::new([("osmosis", dec!(0.5))]);
    let cache = PriceCache::new(provider, clock.clone(), DEFAULT_TTL);
    cache
        .import([PriceEntry {
            token_id: "cosmos".to_string(),
            usd_price: dec!(4.0),
            fetched_at: clock.now() - Duration::from_secs(600),
        }])
        .await;

    // when
    let prices = cache.get_or_fetch(&ids(&["cosmos", "osmosis", "umee"])).await;

    // then
    assert_eq!(prices.get("cosmos"), Ok(dec!(4.0)));
    assert_eq!(prices.get("osmosis"), Ok(dec!(0.5)));
    assert!(prices.get("umee").is_err());
}

#[tokio::test]
async fn older_entries_never_overwrite_newer_ones() {
    // given
    let clock = TestClock::default();
    let cache = PriceCache::new(RecordingPriceApi::default(), clock.clone(), DEFAULT_TTL);
    let newer = PriceEntry {
        token_id: "cosmos".to_string(),
        usd_price: dec!(5),
        fetched_at: clock.now(),
    };
    let older = PriceEntry {
        usd_price: dec!(4),
        fetched_at: clock.now() - Duration::from_secs(1),
        ..newer.clone()
    };

    // when
    cache.import([newer.clone(), older]).await;

    // then
    assert_eq!(cache.export().await, vec![newer]);
}

#[tokio::test]
async fn empty_request_skips_the_provider() {
    let provider = RecordingPriceApi::default();
    let cache = PriceCache::new(provider.clone(), TestClock::default(), DEFAULT_TTL);

    let prices = cache.get_or_fetch(&BTreeSet::new()).await;

    assert!(prices.is_empty());
    assert_eq!(provider.request_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_misses_share_one_upstream_request() {
    // given
    let provider = RecordingPriceApi::new([("cosmos", dec!(4.2))])
        .with_latency(Duration::from_millis(100));
    let cache = Arc::new(PriceCache::new(
        provider.clone(),
        TestClock::default(),
        DEFAULT_TTL,
    ));

    // when
    let lookups = (0..8).map(|_| {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move { cache.get_or_fetch_one("cosmos").await })
    });
    let results = futures::future::join_all(lookups).await;

    // then
    for result in results {
        assert_eq!(result.unwrap(), Ok(dec!(4.2)));
    }
    assert_eq!(provider.request_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_misses_during_an_outage_share_one_failed_request() {
    // given
    let clock = TestClock::default();
    let provider = RecordingPriceApi::default().with_latency(Duration::from_millis(100));
    provider.set_failing(true);
    let cache = Arc::new(PriceCache::new(provider.clone(), clock.clone(), DEFAULT_TTL));
    cache
        .import([PriceEntry {
            token_id: "cosmos".to_string(),
            usd_price: dec!(4.2),
            fetched_at: clock.now() - Duration::from_secs(3600),
        }])
        .await;

    // when
    let lookups = (0..8).map(|_| {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move { cache.get_or_fetch_one("cosmos").await })
    });
    let results = futures::future::join_all(lookups).await;

    // then
    for result in results {
        assert_eq!(result.unwrap(), Ok(dec!(4.2)));
    }
    assert_eq!(provider.request_count(), 1);
}

#[tokio::test]
async fn failed_request_does_not_suppress_later_retries() {
    // given
    let clock = TestClock::default();
    let provider = RecordingPriceApi::new([("cosmos", dec!(4.2))]);
    provider.set_failing(true);
    let cache = PriceCache::new(provider.clone(), clock.clone(), DEFAULT_TTL);
    assert!(cache.get_or_fetch_one("cosmos").await.is_err());

    // when
    provider.set_failing(false);
    let price = cache.get_or_fetch_one("cosmos").await;

    // then
    assert_eq!(price, Ok(dec!(4.2)));
    assert_eq!(provider.request_count(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn waiter_still_fetches_tokens_the_inflight_request_did_not_cover() {
    // given
    let provider = RecordingPriceApi::new([("cosmos", dec!(4.2)), ("osmosis", dec!(0.5))])
        .with_latency(Duration::from_millis(100));
    let cache = Arc::new(PriceCache::new(
        provider.clone(),
        TestClock::default(),
        DEFAULT_TTL,
    ));

    // when
    let cosmos = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move { cache.get_or_fetch_one("cosmos").await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    let osmosis = cache.get_or_fetch_one("osmosis").await;

    // then
    assert_eq!(cosmos.await.unwrap(), Ok(dec!(4.2)));
    assert_eq!(osmosis, Ok(dec!(0.5)));
    assert_eq!(provider.request_count(), 2);
}
