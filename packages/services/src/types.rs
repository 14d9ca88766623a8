use std::collections::BTreeMap;

pub use chrono::{DateTime, Utc};
pub use rust_decimal::Decimal;

use crate::{Error, Result};

/// A USD quote for one token as held by the price cache. Never mutated, a
/// refresh replaces the whole entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceEntry {
    pub token_id: String,
    pub usd_price: Decimal,
    pub fetched_at: DateTime<Utc>,
}

/// Staking state of one host zone, fetched per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostZoneState {
    pub chain_id: String,
    /// Total delegated amount in whole native tokens.
    pub total_staked: Decimal,
    pub redemption_rate: Decimal,
    pub native_token_denom: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeResult {
    pub chain_id: String,
    pub daily_fees: Decimal,
    pub daily_revenue: Decimal,
}

/// Prices resolved by a cache lookup. Tokens the cache could not price are
/// simply absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prices {
    prices: BTreeMap<String, Decimal>,
}

impl Prices {
    pub fn get(&self, token_id: &str) -> Result<Decimal> {
        self.prices
            .get(token_id)
            .copied()
            .ok_or_else(|| Error::PriceUnavailable(token_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl FromIterator<(String, Decimal)> for Prices {
    fn from_iter<T: IntoIterator<Item = (String, Decimal)>>(iter: T) -> Self {
        Self {
            prices: iter.into_iter().collect(),
        }
    }
}
