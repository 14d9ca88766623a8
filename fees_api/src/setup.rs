use ::metrics::{Registry, RegistersMetrics};
use clock::SystemClock;
use services::{ChainRegistry, FeeAggregator, FeeEstimator, PriceCache};
use tracing_subscriber::EnvFilter;
use upstream::{CoinGeckoClient, Endpoint, FailoverClient, StrideClient};

use crate::{config::Config, errors::Result};

pub type Prices = PriceCache<CoinGeckoClient, SystemClock>;
pub type Aggregator = FeeAggregator<StrideClient, CoinGeckoClient, SystemClock>;

pub fn setup_logger() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_level(true)
        .with_line_number(true)
        .with_env_filter(filter)
        .json()
        .init();
}

pub fn create_stride_client(config: &Config, registry: &Registry) -> Result<StrideClient> {
    let rest = FailoverClient::new(
        "stride",
        Endpoint::primary_with_fallbacks(
            config.stride.api_url.clone(),
            config.stride.fallback_api_urls.clone(),
        ),
        config.stride.request_timeout,
    )?;
    let rpc = FailoverClient::new(
        "stride_rpc",
        Endpoint::primary_with_fallbacks(config.stride.rpc_url.clone(), vec![]),
        config.stride.request_timeout,
    )?;

    let stride = StrideClient::new(rest, rpc);
    stride.register_metrics(registry);

    Ok(stride)
}

pub fn create_price_cache(config: &Config, registry: &Registry) -> Result<Prices> {
    let coingecko = CoinGeckoClient::new(FailoverClient::new(
        "coingecko",
        Endpoint::primary_with_fallbacks(
            config.prices.api_url.clone(),
            config.prices.fallback_api_urls.clone(),
        ),
        config.prices.request_timeout,
    )?);
    coingecko.register_metrics(registry);

    let price_cache = PriceCache::new(coingecko, SystemClock, config.prices.cache_ttl);
    price_cache.register_metrics(registry);

    Ok(price_cache)
}

pub fn create_fee_aggregator(
    config: &Config,
    stride: StrideClient,
    price_cache: Prices,
) -> Aggregator {
    FeeAggregator::new(
        stride,
        price_cache,
        FeeEstimator::new(config.fees.apy, config.fees.fee_share),
        ChainRegistry::default(),
    )
}
