use crate::{
    Error, Result,
    types::{Decimal, FeeResult, HostZoneState},
};

/// Assumed annual staking yield, 18%.
pub const DEFAULT_APY: Decimal = Decimal::from_parts(18, 0, 0, false, 2);
/// Share of the staking rewards the protocol keeps, 10%.
pub const DEFAULT_FEE_SHARE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

const DAYS_PER_YEAR: Decimal = Decimal::from_parts(365, 0, 0, false, 0);

/// Estimates daily fees from the staked amount and a constant APY.
///
/// This is an estimate: it does not look at realized redemption-rate changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeEstimator {
    apy: Decimal,
    fee_share: Decimal,
}

impl Default for FeeEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_APY, DEFAULT_FEE_SHARE)
    }
}

impl FeeEstimator {
    pub const fn new(apy: Decimal, fee_share: Decimal) -> Self {
        Self { apy, fee_share }
    }

    pub const fn apy(&self) -> Decimal {
        self.apy
    }

    pub const fn fee_share(&self) -> Decimal {
        self.fee_share
    }

    pub fn estimate(&self, host_zone: &HostZoneState, usd_price: Decimal) -> Result<FeeResult> {
        let overflow = || {
            Error::Other(format!(
                "fee estimate for {} does not fit into a decimal",
                host_zone.chain_id
            ))
        };

        let daily_rate = self.apy.checked_div(DAYS_PER_YEAR).ok_or_else(overflow)?;
        let daily_native_reward = host_zone
            .total_staked
            .checked_mul(daily_rate)
            .ok_or_else(overflow)?;
        let daily_fees = daily_native_reward
            .checked_mul(usd_price)
            .ok_or_else(overflow)?;
        let daily_revenue = daily_fees
            .checked_mul(self.fee_share)
            .ok_or_else(overflow)?;

        Ok(FeeResult {
            chain_id: host_zone.chain_id.clone(),
            daily_fees,
            daily_revenue,
        })
    }
}
