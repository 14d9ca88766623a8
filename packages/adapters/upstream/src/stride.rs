use std::str::FromStr;

use ::metrics::{RegistersMetrics, prometheus::core::Collector};
use rust_decimal::Decimal;
use serde::{Deserialize, de::IgnoredAny};
use services::{
    SupportedChain,
    fee_aggregator::port::staking,
    health_reporter::port::{EndpointStatus, Probe, ProbeReport},
    types::HostZoneState,
};
use tracing::debug;

use crate::{FailoverClient, Probed};

const HOST_ZONE_PATH: &str = "Stride-Labs/stride/stakeibc/host_zone";
const RPC_HEALTH_PATH: &str = "health";

#[derive(Debug, Deserialize)]
struct HostZoneResponse {
    host_zone: Option<RawHostZone>,
}

#[derive(Debug, Deserialize)]
struct RawHostZone {
    chain_id: String,
    host_denom: String,
    redemption_rate: String,
    total_delegations: String,
}

#[derive(Debug, Deserialize)]
struct HostZoneList {
    #[serde(default)]
    host_zone: Vec<IgnoredAny>,
}

/// Reads host-zone state from the Stride REST API and checks the RPC node.
#[derive(Clone)]
pub struct StrideClient {
    rest: FailoverClient,
    rpc: FailoverClient,
}

impl StrideClient {
    #[must_use]
    pub fn new(rest: FailoverClient, rpc: FailoverClient) -> Self {
        Self { rest, rpc }
    }
}

impl staking::Api for StrideClient {
    async fn host_zone(&self, chain: SupportedChain) -> services::Result<HostZoneState> {
        let path = format!("{HOST_ZONE_PATH}/{}", chain.host_zone_id);

        let host_zone = self
            .rest
            .get_with(&path, &[], |response: HostZoneResponse| {
                let raw = response
                    .host_zone
                    .ok_or_else(|| "response carries no host_zone".to_string())?;
                parse_host_zone(raw, chain.decimals)
            })
            .await?;

        debug!(
            "{} has {} {} staked",
            chain.name, host_zone.total_staked, host_zone.native_token_denom
        );

        Ok(host_zone)
    }
}

impl Probe for StrideClient {
    async fn probe(&self) -> ProbeReport {
        let (rest, rpc) = futures::join!(
            self.rest.probe::<HostZoneList>(HOST_ZONE_PATH),
            self.rpc.probe::<IgnoredAny>(RPC_HEALTH_PATH)
        );

        let rest_endpoints = rest
            .into_iter()
            .map(|probed| {
                let host_zones_count = probed
                    .response
                    .as_ref()
                    .ok()
                    .map(|list| list.host_zone.len());
                endpoint_status(probed, host_zones_count)
            })
            .collect();

        ProbeReport {
            rest_endpoints,
            rpc_endpoint: endpoint_status(rpc.head, None),
        }
    }
}

impl RegistersMetrics for StrideClient {
    fn metrics(&self) -> Vec<Box<dyn Collector>> {
        self.rest
            .metrics()
            .into_iter()
            .chain(self.rpc.metrics())
            .collect()
    }
}

fn endpoint_status<R>(probed: Probed<R>, host_zones_count: Option<usize>) -> EndpointStatus {
    EndpointStatus {
        name: probed.endpoint.name,
        url: probed.endpoint.url.to_string(),
        reachable: probed.response.is_ok(),
        healthy: probed.healthy,
        host_zones_count,
    }
}

fn parse_host_zone(raw: RawHostZone, decimals: u32) -> Result<HostZoneState, String> {
    let redemption_rate = Decimal::from_str(raw.redemption_rate.trim())
        .map_err(|e| format!("invalid redemption_rate `{}`: {e}", raw.redemption_rate))?;

    Ok(HostZoneState {
        total_staked: base_units_to_tokens(&raw.total_delegations, decimals)?,
        chain_id: raw.chain_id,
        redemption_rate,
        native_token_denom: raw.host_denom,
    })
}

/// Converts an integer amount of base units (e.g. `uatom`) into whole tokens
/// without going through floating point.
pub fn base_units_to_tokens(raw: &str, decimals: u32) -> Result<Decimal, String> {
    let base_units: u128 = raw
        .trim()
        .parse()
        .map_err(|e| format!("invalid base unit amount `{raw}`: {e}"))?;
    let one_token = 10u128
        .checked_pow(decimals)
        .ok_or_else(|| format!("unsupported number of decimals: {decimals}"))?;

    let to_decimal = |amount: u128, scale: u32| {
        i128::try_from(amount)
            .ok()
            .and_then(|amount| Decimal::try_from_i128_with_scale(amount, scale).ok())
            .ok_or_else(|| format!("amount `{raw}` does not fit into a decimal"))
    };

    let whole = to_decimal(base_units / one_token, 0)?;
    let fraction = to_decimal(base_units % one_token, decimals)?;

    whole
        .checked_add(fraction)
        .map(|tokens| tokens.normalize())
        .ok_or_else(|| format!("amount `{raw}` does not fit into a decimal"))
}
