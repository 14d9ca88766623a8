use std::collections::BTreeMap;

use futures::future::join_all;
use tracing::{info, warn};

use super::port::staking;
use crate::{
    ChainRegistry, FeeEstimator, PriceCache, Result, SupportedChain,
    price_cache::port::{Clock, price},
    types::{FeeResult, Prices},
};

/// Entry point of the HTTP layer: turns a chain name into a fee estimate.
pub struct FeeAggregator<S, P, C> {
    staking: S,
    prices: PriceCache<P, C>,
    estimator: FeeEstimator,
    chains: ChainRegistry,
}

impl<S, P, C> FeeAggregator<S, P, C> {
    pub fn new(
        staking: S,
        prices: PriceCache<P, C>,
        estimator: FeeEstimator,
        chains: ChainRegistry,
    ) -> Self {
        Self {
            staking,
            prices,
            estimator,
            chains,
        }
    }

    pub fn chains(&self) -> &ChainRegistry {
        &self.chains
    }

    pub fn price_cache(&self) -> &PriceCache<P, C> {
        &self.prices
    }
}

impl<S, P, C> FeeAggregator<S, P, C>
where
    S: staking::Api + Sync,
    P: price::Api + Sync,
    C: Clock + Sync,
{
    pub async fn get_fees(&self, chain: &str) -> Result<FeeResult> {
        let chain = self.chains.resolve(chain)?;

        let host_zone = self.staking.host_zone(chain).await?;
        let usd_price = self.prices.get_or_fetch_one(chain.price_id).await?;

        self.estimator.estimate(&host_zone, usd_price)
    }

    /// Fees of every supported chain keyed by chain name. Prices for all
    /// chains are fetched in a single batch up front; a failing chain only
    /// affects its own entry.
    pub async fn get_all_fees(&self) -> BTreeMap<String, Result<FeeResult>> {
        let prices = self.prices.get_or_fetch(&self.chains.price_ids()).await;
        info!(
            "priced {} of {} chains",
            prices.len(),
            self.chains.chains().len()
        );

        let chains = self.chains.chains();
        let results = join_all(
            chains
                .iter()
                .map(|chain| self.fees_with_prices(*chain, &prices)),
        )
        .await;

        chains
            .iter()
            .zip(results)
            .map(|(chain, result)| {
                if let Err(e) = &result {
                    warn!("failed to get fees for {}: {e}", chain.name);
                }
                (chain.name.to_string(), result)
            })
            .collect()
    }

    async fn fees_with_prices(&self, chain: SupportedChain, prices: &Prices) -> Result<FeeResult> {
        let host_zone = self.staking.host_zone(chain).await?;
        let usd_price = prices.get(chain.price_id)?;

        self.estimator.estimate(&host_zone, usd_price)
    }
}
