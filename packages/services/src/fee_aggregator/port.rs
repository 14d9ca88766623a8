pub mod staking {
    use crate::{chains::SupportedChain, types::HostZoneState};

    /// Source of Stride host-zone staking state.
    #[allow(async_fn_in_trait)]
    #[trait_variant::make(Send)]
    #[cfg_attr(feature = "test-helpers", mockall::automock)]
    pub trait Api {
        async fn host_zone(&self, chain: SupportedChain) -> crate::Result<HostZoneState>;
    }

    #[cfg(feature = "test-helpers")]
    pub mod testing {
        use std::{
            collections::BTreeMap,
            sync::{Arc, Mutex},
        };

        use super::Api;
        use crate::{
            Error,
            chains::SupportedChain,
            types::{Decimal, HostZoneState},
        };

        /// Serves host zones registered up front and records every request.
        /// Unknown host zones fail as if every endpoint was down.
        #[derive(Debug, Clone, Default)]
        pub struct PreconfiguredStakingApi {
            host_zones: BTreeMap<String, HostZoneState>,
            requests: Arc<Mutex<Vec<String>>>,
        }

        impl PreconfiguredStakingApi {
            pub fn new(host_zones: impl IntoIterator<Item = HostZoneState>) -> Self {
                Self {
                    host_zones: host_zones
                        .into_iter()
                        .map(|zone| (zone.chain_id.clone(), zone))
                        .collect(),
                    requests: Arc::default(),
                }
            }

            /// Same staked amount for every given chain.
            pub fn uniform(chains: &[SupportedChain], total_staked: Decimal) -> Self {
                Self::new(chains.iter().map(|chain| HostZoneState {
                    chain_id: chain.host_zone_id.to_string(),
                    total_staked,
                    redemption_rate: Decimal::ONE,
                    native_token_denom: format!("u{}", chain.name),
                }))
            }

            pub fn without(mut self, host_zone_id: &str) -> Self {
                self.host_zones.remove(host_zone_id);
                self
            }

            /// Host-zone ids requested so far, in order.
            pub fn requests(&self) -> Vec<String> {
                self.requests.lock().expect("lock not poisoned").clone()
            }
        }

        impl Api for PreconfiguredStakingApi {
            async fn host_zone(&self, chain: SupportedChain) -> crate::Result<HostZoneState> {
                self.requests
                    .lock()
                    .expect("lock not poisoned")
                    .push(chain.host_zone_id.to_string());

                self.host_zones
                    .get(chain.host_zone_id)
                    .cloned()
                    .ok_or_else(|| {
                        Error::UpstreamUnavailable(format!(
                            "host zone {} not served",
                            chain.host_zone_id
                        ))
                    })
            }
        }
    }
}
