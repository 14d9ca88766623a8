use clock::TestClock;
use mockall::predicate::eq;
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use services::{
    ChainRegistry, Error, FeeAggregator, FeeEstimator, PriceCache,
    chains::SUPPORTED_CHAINS,
    fee_aggregator::port::staking::{MockApi, testing::PreconfiguredStakingApi},
    price_cache::{
        port::price::{MockApi as MockPriceApi, testing::RecordingPriceApi},
        service::DEFAULT_TTL,
    },
    types::{Decimal, FeeResult, HostZoneState},
};

fn cosmos_zone() -> HostZoneState {
    HostZoneState {
        chain_id: "cosmoshub-4".to_string(),
        total_staked: dec!(3650000),
        redemption_rate: dec!(1.3),
        native_token_denom: "uatom".to_string(),
    }
}

#[tokio::test]
async fn unknown_chain_makes_no_upstream_calls() {
    // given
    let mut staking = MockApi::new();
    staking.expect_host_zone().never();
    let mut prices = MockPriceApi::new();
    prices.expect_prices().never();

    let aggregator = FeeAggregator::new(
        staking,
        PriceCache::new(prices, TestClock::default(), DEFAULT_TTL),
        FeeEstimator::default(),
        ChainRegistry::default(),
    );

    // when
    let result = aggregator.get_fees("solana").await;

    // then
    assert_eq!(result, Err(Error::UnknownChain("solana".to_string())));
}

#[tokio::test]
async fn computes_fees_for_a_single_chain() {
    // given
    let cosmos = ChainRegistry::default().resolve("cosmos").unwrap();
    let mut staking = MockApi::new();
    staking
        .expect_host_zone()
        .with(eq(cosmos))
        .once()
        .returning(|_| Box::pin(async { Ok(cosmos_zone()) }));

    let aggregator = FeeAggregator::new(
        staking,
        PriceCache::new(
            RecordingPriceApi::new([("cosmos", dec!(5))]),
            TestClock::default(),
            DEFAULT_TTL,
        ),
        FeeEstimator::new(dec!(0.365), dec!(0.10)),
        ChainRegistry::default(),
    );

    // when
    let fees = aggregator.get_fees("cosmos").await.unwrap();

    // then
    assert_eq!(
        fees,
        FeeResult {
            chain_id: "cosmoshub-4".to_string(),
            daily_fees: dec!(18250),
            daily_revenue: dec!(1825),
        }
    );
}

#[tokio::test]
async fn staking_failure_is_surfaced() {
    // given
    let mut staking = MockApi::new();
    staking.expect_host_zone().returning(|_| {
        Box::pin(async { Err(Error::UpstreamUnavailable("all endpoints down".to_string())) })
    });

    let aggregator = FeeAggregator::new(
        staking,
        PriceCache::new(
            RecordingPriceApi::new([("osmosis", dec!(0.5))]),
            TestClock::default(),
            DEFAULT_TTL,
        ),
        FeeEstimator::default(),
        ChainRegistry::default(),
    );

    // when
    let result = aggregator.get_fees("osmosis").await;

    // then
    assert!(matches!(result, Err(Error::UpstreamUnavailable(_))));
}

#[tokio::test]
async fn missing_price_is_surfaced() {
    // given
    let staking = PreconfiguredStakingApi::uniform(&SUPPORTED_CHAINS, dec!(1000));
    let aggregator = FeeAggregator::new(
        staking,
        PriceCache::new(
            RecordingPriceApi::default(),
            TestClock::default(),
            DEFAULT_TTL,
        ),
        FeeEstimator::default(),
        ChainRegistry::default(),
    );

    // when
    let result = aggregator.get_fees("juno").await;

    // then
    assert_eq!(
        result,
        Err(Error::PriceUnavailable("juno-network".to_string()))
    );
}

#[tokio::test]
async fn one_failing_chain_does_not_abort_the_others() {
    // given
    let staking =
        PreconfiguredStakingApi::uniform(&SUPPORTED_CHAINS, dec!(1000)).without("juno-1");
    let prices = RecordingPriceApi::new(
        SUPPORTED_CHAINS
            .iter()
            .filter(|chain| chain.name != "band")
            .map(|chain| (chain.price_id, Decimal::ONE)),
    );
    let aggregator = FeeAggregator::new(
        staking,
        PriceCache::new(prices, TestClock::default(), DEFAULT_TTL),
        FeeEstimator::default(),
        ChainRegistry::default(),
    );

    // when
    let all_fees = aggregator.get_all_fees().await;

    // then
    assert_eq!(all_fees.len(), 14);
    assert!(matches!(
        all_fees["juno"],
        Err(Error::UpstreamUnavailable(_))
    ));
    assert_eq!(
        all_fees["band"],
        Err(Error::PriceUnavailable("band-protocol".to_string()))
    );
    assert_eq!(all_fees.values().filter(|result| result.is_ok()).count(), 12);
}
