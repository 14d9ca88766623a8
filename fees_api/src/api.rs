use std::{collections::BTreeMap, sync::Arc};

use ::metrics::prometheus::{self, Encoder, Registry, TextEncoder};
use actix_web::{
    App, HttpResponse, HttpServer, Responder, error::InternalError, http::StatusCode, web,
};
use clock::SystemClock;
use rust_decimal::Decimal;
use serde::Serialize;
use services::{
    FeeAggregator, HealthReporter, fee_aggregator::port::staking, health_reporter::port::Probe,
    price_cache::port::{Clock, price},
    types::FeeResult,
};
use upstream::{CoinGeckoClient, StrideClient};

use crate::{
    config::Config,
    errors::{ApiError, Error, Result},
    setup::Aggregator,
};

pub async fn launch_api_server(
    config: &Config,
    metrics_registry: Registry,
    fee_aggregator: Aggregator,
    health_reporter: HealthReporter<StrideClient>,
) -> Result<()> {
    let metrics_registry = Arc::new(metrics_registry);
    let fee_aggregator = Arc::new(fee_aggregator);
    let health_reporter = Arc::new(health_reporter);
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(Arc::clone(&metrics_registry)))
            .app_data(web::Data::new(Arc::clone(&fee_aggregator)))
            .app_data(web::Data::new(Arc::clone(&health_reporter)))
            .configure(routes::<StrideClient, CoinGeckoClient, SystemClock, StrideClient>)
    })
    .bind((config.app.host, config.app.port))
    .map_err(|e| Error::Network(e.to_string()))?
    .run()
    .await
    .map_err(|e| Error::Other(e.to_string()))
}

/// Registers every endpoint. `/api/all/...` comes before `/api/{chain}/...`
/// so that `all` is never taken for a chain name.
fn routes<S, P, C, H>(cfg: &mut web::ServiceConfig)
where
    S: staking::Api + Sync + 'static,
    P: price::Api + Sync + 'static,
    C: Clock + Sync + 'static,
    H: Probe + 'static,
{
    cfg.route("/", web::get().to(root))
        .route("/health", web::get().to(health::<H>))
        .route("/metrics", web::get().to(metrics))
        .route("/api/all/stats/fees", web::get().to(all_fees::<S, P, C>))
        .route("/api/{chain}/stats/fees", web::get().to(chain_fees::<S, P, C>));
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DailyFees {
    #[serde(with = "rust_decimal::serde::float")]
    daily_fees: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    daily_revenue: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl DailyFees {
    fn failed(error: &services::Error) -> Self {
        Self {
            daily_fees: Decimal::ZERO,
            daily_revenue: Decimal::ZERO,
            error: Some(error.to_string()),
        }
    }
}

impl From<FeeResult> for DailyFees {
    fn from(result: FeeResult) -> Self {
        Self {
            daily_fees: result.daily_fees,
            daily_revenue: result.daily_revenue,
            error: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChainFeesResponse {
    fees: DailyFees,
}

#[derive(Debug, Serialize)]
struct AllFeesResponse {
    chains: BTreeMap<String, DailyFees>,
}

async fn root() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "service": "Stride Fees API",
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn chain_fees<S, P, C>(
    aggregator: web::Data<Arc<FeeAggregator<S, P, C>>>,
    chain: web::Path<String>,
) -> std::result::Result<HttpResponse, ApiError>
where
    S: staking::Api + Sync + 'static,
    P: price::Api + Sync + 'static,
    C: Clock + Sync + 'static,
{
    let fees = aggregator.get_fees(&chain).await?;

    Ok(HttpResponse::Ok().json(ChainFeesResponse {
        fees: fees.into(),
    }))
}

async fn all_fees<S, P, C>(aggregator: web::Data<Arc<FeeAggregator<S, P, C>>>) -> impl Responder
where
    S: staking::Api + Sync + 'static,
    P: price::Api + Sync + 'static,
    C: Clock + Sync + 'static,
{
    let chains = aggregator
        .get_all_fees()
        .await
        .into_iter()
        .map(|(chain, result)| {
            let fees = match result {
                Ok(fees) => fees.into(),
                Err(e) => DailyFees::failed(&e),
            };
            (chain, fees)
        })
        .collect();

    HttpResponse::Ok().json(AllFeesResponse { chains })
}

async fn health<H>(reporter: web::Data<Arc<HealthReporter<H>>>) -> impl Responder
where
    H: Probe + 'static,
{
    let report = reporter.report().await;

    let mut response = if report.is_healthy() {
        HttpResponse::Ok()
    } else {
        HttpResponse::ServiceUnavailable()
    };

    response.json(report)
}

async fn metrics(registry: web::Data<Arc<Registry>>) -> impl Responder {
    let encoder = TextEncoder::new();
    let mut buf: Vec<u8> = vec![];
    let mut encode = |metrics: &_| {
        encoder
            .encode(metrics, &mut buf)
            .map_err(map_to_internal_err)
    };

    encode(&registry.gather())?;
    encode(&prometheus::gather())?;

    let text = String::from_utf8(buf).map_err(map_to_internal_err)?;

    std::result::Result::<_, InternalError<_>>::Ok(text)
}

fn map_to_internal_err(error: impl std::error::Error) -> InternalError<String> {
    InternalError::new(error.to_string(), StatusCode::INTERNAL_SERVER_ERROR)
}
