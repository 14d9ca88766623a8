pub mod chains;
pub mod fee_aggregator;
pub mod fee_estimator;
pub mod health_reporter;
pub mod price_cache;
pub mod types;

pub use chains::{ChainRegistry, SupportedChain};
pub use fee_aggregator::service::FeeAggregator;
pub use fee_estimator::FeeEstimator;
pub use health_reporter::{HealthReport, HealthReporter};
pub use price_cache::service::PriceCache;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Unknown chain: {0}")]
    UnknownChain(String),
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("Price unavailable for token '{0}'")]
    PriceUnavailable(String),
    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(error: String) -> Self {
        Self::Other(error)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
