use std::collections::BTreeSet;

use crate::{Error, Result};

/// A chain with a Stride host zone whose fees are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupportedChain {
    /// Name used in the public API, e.g. `cosmos`.
    pub name: &'static str,
    /// Chain id of the Stride host zone, e.g. `cosmoshub-4`.
    pub host_zone_id: &'static str,
    /// Id of the native token at the price provider.
    pub price_id: &'static str,
    /// Decimals of the native token's base denom.
    pub decimals: u32,
}

const fn chain(
    name: &'static str,
    host_zone_id: &'static str,
    price_id: &'static str,
    decimals: u32,
) -> SupportedChain {
    SupportedChain {
        name,
        host_zone_id,
        price_id,
        decimals,
    }
}

pub const SUPPORTED_CHAINS: [SupportedChain; 14] = [
    chain("cosmos", "cosmoshub-4", "cosmos", 6),
    chain("celestia", "celestia", "celestia", 6),
    chain("osmosis", "osmosis-1", "osmosis", 6),
    chain("dydx", "dydx-mainnet-1", "dydx-chain", 18),
    chain("dymension", "dymension_1100-1", "dymension", 18),
    chain("juno", "juno-1", "juno-network", 6),
    chain("stargaze", "stargaze-1", "stargaze", 6),
    chain("terra2", "phoenix-1", "terra-luna-2", 6),
    chain("evmos", "evmos_9001-2", "evmos", 18),
    chain("injective", "injective-1", "injective-protocol", 18),
    chain("umee", "umee-1", "umee", 6),
    chain("comdex", "comdex-1", "comdex", 6),
    chain("haqq", "haqq_11235-1", "islamic-coin", 18),
    chain("band", "laozi-mainnet", "band-protocol", 6),
];

// alias -> canonical name
const ALIASES: [(&str, &str); 1] = [("terra", "terra2")];

#[derive(Debug, Clone)]
pub struct ChainRegistry {
    chains: Vec<SupportedChain>,
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self::new(SUPPORTED_CHAINS.to_vec())
    }
}

impl ChainRegistry {
    pub fn new(chains: Vec<SupportedChain>) -> Self {
        Self { chains }
    }

    pub fn chains(&self) -> &[SupportedChain] {
        &self.chains
    }

    /// Looks a chain up by its public name. Matching ignores case and
    /// understands aliases such as `terra`.
    pub fn resolve(&self, name: &str) -> Result<SupportedChain> {
        let normalized = name.trim().to_lowercase();
        let canonical = ALIASES
            .iter()
            .find(|(alias, _)| *alias == normalized)
            .map_or(normalized.as_str(), |(_, canonical)| *canonical);

        self.chains
            .iter()
            .find(|chain| chain.name == canonical)
            .copied()
            .ok_or_else(|| Error::UnknownChain(name.to_string()))
    }

    pub fn price_ids(&self) -> BTreeSet<String> {
        self.chains
            .iter()
            .map(|chain| chain.price_id.to_string())
            .collect()
    }
}
