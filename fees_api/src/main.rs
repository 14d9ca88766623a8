#![deny(unused_crate_dependencies)]
mod api;
mod config;
mod errors;
mod setup;

use ::metrics::Registry;
use api::launch_api_server;
use errors::{Result, WithContext};
use services::HealthReporter;
use setup::{create_fee_aggregator, create_price_cache, create_stride_client, setup_logger};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    setup_logger();

    let config = config::parse().with_context(|| "failed to load configuration")?;

    let metrics_registry = Registry::default();

    let stride = create_stride_client(&config, &metrics_registry)?;
    let price_cache = create_price_cache(&config, &metrics_registry)?;
    let fee_aggregator = create_fee_aggregator(&config, stride.clone(), price_cache);
    let health_reporter = HealthReporter::new(stride);

    info!(
        "serving fees for {} chains on {}:{}, prices cached for {}",
        fee_aggregator.chains().chains().len(),
        config.app.host,
        config.app.port,
        humantime::format_duration(fee_aggregator.price_cache().ttl())
    );

    launch_api_server(&config, metrics_registry, fee_aggregator, health_reporter).await
}
