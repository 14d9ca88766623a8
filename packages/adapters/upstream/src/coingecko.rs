use std::{
    collections::{BTreeMap, BTreeSet},
    str::FromStr,
};

use ::metrics::{RegistersMetrics, prometheus::core::Collector};
use itertools::Itertools;
use rust_decimal::Decimal;
use serde::Deserialize;
use services::price_cache::port::price;
use tracing::{info, warn};

use crate::FailoverClient;

const SIMPLE_PRICE_PATH: &str = "simple/price";

#[derive(Debug, Deserialize)]
struct Quote {
    usd: Option<serde_json::Number>,
}

/// USD quotes from the CoinGecko `simple/price` endpoint. A whole batch of
/// tokens is priced with one request.
#[derive(Clone)]
pub struct CoinGeckoClient {
    client: FailoverClient,
}

impl CoinGeckoClient {
    #[must_use]
    pub fn new(client: FailoverClient) -> Self {
        Self { client }
    }
}

impl price::Api for CoinGeckoClient {
    async fn prices(
        &self,
        token_ids: BTreeSet<String>,
    ) -> services::Result<BTreeMap<String, Decimal>> {
        if token_ids.is_empty() {
            return Ok(BTreeMap::new());
        }

        let ids = token_ids.iter().join(",");
        info!("fetching USD prices for {ids}");

        let quotes: BTreeMap<String, Quote> = self
            .client
            .get_json(SIMPLE_PRICE_PATH, &[("ids", ids.as_str()), ("vs_currencies", "usd")])
            .await?;

        let prices = quotes
            .into_iter()
            .filter(|(id, _)| token_ids.contains(id))
            .filter_map(|(id, quote)| {
                let usd = quote.usd?;
                match parse_number(&usd) {
                    Some(price) => Some((id, price)),
                    None => {
                        warn!("ignoring unparsable price `{usd}` for {id}");
                        None
                    }
                }
            })
            .collect();

        Ok(prices)
    }
}

impl RegistersMetrics for CoinGeckoClient {
    fn metrics(&self) -> Vec<Box<dyn Collector>> {
        self.client.metrics()
    }
}

fn parse_number(number: &serde_json::Number) -> Option<Decimal> {
    let repr = number.to_string();
    Decimal::from_str(&repr)
        .or_else(|_| Decimal::from_scientific(&repr))
        .ok()
}
