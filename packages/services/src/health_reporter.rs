pub mod port {
    use serde::Serialize;

    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct EndpointStatus {
        pub name: String,
        pub url: String,
        /// Answered the probe just now.
        pub reachable: bool,
        /// Below the consecutive-failure threshold on regular traffic.
        pub healthy: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub host_zones_count: Option<usize>,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ProbeReport {
        pub rest_endpoints: Vec<EndpointStatus>,
        pub rpc_endpoint: EndpointStatus,
    }

    /// Actively checks the staking-state endpoints.
    #[allow(async_fn_in_trait)]
    #[trait_variant::make(Send)]
    #[cfg_attr(feature = "test-helpers", mockall::automock)]
    pub trait Probe {
        async fn probe(&self) -> ProbeReport;
    }
}

use serde::Serialize;

use self::port::{EndpointStatus, Probe};

#[derive(Debug, Serialize)]
pub struct HealthReport {
    status: &'static str,
    stride_api: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    host_zones_count: Option<usize>,
    rest_endpoints: Vec<EndpointStatus>,
    rpc_endpoint: EndpointStatus,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.rest_endpoints.iter().any(|endpoint| endpoint.reachable)
    }
}

pub struct HealthReporter<P> {
    probe: P,
}

impl<P: Probe> HealthReporter<P> {
    #[must_use]
    pub fn new(probe: P) -> Self {
        Self { probe }
    }

    pub async fn report(&self) -> HealthReport {
        let probe = self.probe.probe().await;

        let reachable = probe
            .rest_endpoints
            .iter()
            .find(|endpoint| endpoint.reachable);

        HealthReport {
            status: if reachable.is_some() {
                "healthy"
            } else {
                "unhealthy"
            },
            stride_api: if reachable.is_some() {
                "connected"
            } else {
                "unreachable"
            },
            host_zones_count: reachable.and_then(|endpoint| endpoint.host_zones_count),
            rest_endpoints: probe.rest_endpoints,
            rpc_endpoint: probe.rpc_endpoint,
        }
    }
}
