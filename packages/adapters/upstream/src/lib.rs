mod coingecko;
mod error;
mod failover;
mod metrics;
mod stride;

pub use coingecko::CoinGeckoClient;
pub use error::{Error, Result};
pub use failover::{Endpoint, FailoverClient, Probed};
pub use stride::{StrideClient, base_units_to_tokens};

/// Consecutive failures after which an endpoint is reported as unhealthy.
pub const UNHEALTHY_AFTER_N_ERRORS: usize = 3;
