use std::{net::Ipv4Addr, path::PathBuf, str::FromStr, time::Duration};

use clap::{Parser, command};
use config::{ConfigBuilder, builder::DefaultState};
use rust_decimal::Decimal;
use serde::Deserialize;
use url::Url;

use crate::errors::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: App,
    pub stride: Stride,
    pub prices: Prices,
    pub fees: Fees,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.prices.cache_ttl.is_zero() {
            return Err(Error::Configuration(
                "prices.cache_ttl must be greater than zero".to_string(),
            ));
        }

        if self.stride.request_timeout.is_zero() || self.prices.request_timeout.is_zero() {
            return Err(Error::Configuration(
                "request timeouts must be greater than zero".to_string(),
            ));
        }

        if self.fees.apy < Decimal::ZERO {
            return Err(Error::Configuration(format!(
                "fees.apy must not be negative, got {}",
                self.fees.apy
            )));
        }

        if self.fees.fee_share < Decimal::ZERO || self.fees.fee_share > Decimal::ONE {
            return Err(Error::Configuration(format!(
                "fees.fee_share must be within [0, 1], got {}",
                self.fees.fee_share
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct App {
    /// Port used by the started server
    pub port: u16,
    /// IPv4 address on which the server will listen for connections
    pub host: Ipv4Addr,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Stride {
    /// Stride REST (LCD) endpoint queried first.
    #[serde(deserialize_with = "parse_url")]
    pub api_url: Url,
    /// REST endpoints tried in order when the primary fails.
    #[serde(default, deserialize_with = "parse_urls")]
    pub fallback_api_urls: Vec<Url>,
    /// Stride Tendermint RPC endpoint, only used for health reporting.
    #[serde(deserialize_with = "parse_url")]
    pub rpc_url: Url,
    #[serde(deserialize_with = "human_readable_duration")]
    pub request_timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Prices {
    #[serde(deserialize_with = "parse_url")]
    pub api_url: Url,
    #[serde(default, deserialize_with = "parse_urls")]
    pub fallback_api_urls: Vec<Url>,
    #[serde(deserialize_with = "human_readable_duration")]
    pub request_timeout: Duration,
    /// How long a fetched price is served without asking the provider again.
    #[serde(deserialize_with = "human_readable_duration")]
    pub cache_ttl: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Fees {
    /// Assumed annual staking yield, e.g. `0.18`.
    pub apy: Decimal,
    /// Share of staking rewards kept by the protocol, e.g. `0.10`.
    pub fee_share: Decimal,
}

fn parse_url<'de, D>(deserializer: D) -> std::result::Result<Url, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let url_str: String = Deserialize::deserialize(deserializer)?;
    Url::from_str(&url_str).map_err(|e| {
        let msg = format!("Failed to parse URL '{url_str}': {e};");
        serde::de::Error::custom(msg)
    })
}

fn parse_urls<'de, D>(deserializer: D) -> std::result::Result<Vec<Url>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let url_strs: Vec<String> = Deserialize::deserialize(deserializer)?;
    url_strs
        .iter()
        .map(|url_str| url_str.trim())
        .filter(|url_str| !url_str.is_empty())
        .map(|url_str| {
            Url::from_str(url_str).map_err(|e| {
                let msg = format!("Failed to parse URL '{url_str}': {e};");
                serde::de::Error::custom(msg)
            })
        })
        .collect()
}

fn human_readable_duration<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let duration_str: String = Deserialize::deserialize(deserializer)?;
    humantime::parse_duration(&duration_str).map_err(|e| {
        let msg = format!("Failed to parse duration '{duration_str}': {e};");
        serde::de::Error::custom(msg)
    })
}

#[derive(Parser)]
#[command(name = "fees-api", version, about, propagate_version = true)]
struct Cli {
    #[arg(value_name = "FILE", help = "Path to an optional configuration file")]
    config_path: Option<PathBuf>,
}

const ENV_PREFIX: &str = "FEES_API";
const LIST_KEYS: [&str; 2] = ["stride.fallback_api_urls", "prices.fallback_api_urls"];

fn with_defaults() -> Result<ConfigBuilder<DefaultState>> {
    Ok(config::Config::builder()
        .set_default("app.host", "0.0.0.0")?
        .set_default("app.port", 8000)?
        .set_default("stride.api_url", "https://stride-api.polkachu.com")?
        .set_default("stride.fallback_api_urls", Vec::<String>::new())?
        .set_default("stride.rpc_url", "https://stride-rpc.polkachu.com")?
        .set_default("stride.request_timeout", "10s")?
        .set_default("prices.api_url", "https://api.coingecko.com/api/v3")?
        .set_default("prices.fallback_api_urls", Vec::<String>::new())?
        .set_default("prices.request_timeout", "10s")?
        .set_default("prices.cache_ttl", "5m")?
        .set_default("fees.apy", "0.18")?
        .set_default("fees.fee_share", "0.10")?)
}

fn environment() -> config::Environment {
    LIST_KEYS.into_iter().fold(
        config::Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .list_separator(",")
            .try_parsing(true),
        |env, key| env.with_list_parse_key(key),
    )
}

pub fn parse() -> Result<Config> {
    let cli = Cli::parse();

    let mut builder = with_defaults()?;
    if let Some(path) = cli.config_path {
        builder = builder.add_source(config::File::from(path));
    }

    let config: Config = builder.add_source(environment()).build()?.try_deserialize()?;
    config.validate()?;

    Ok(config)
}
