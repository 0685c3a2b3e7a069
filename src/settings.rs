use config::{Config, ConfigError, File};
use ethers::types::Address;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::Path;

use crate::liveness::DEFAULT_GRACE_PERIOD_SECS;
use crate::tokens::{Denominations, TokenRegistry};
use crate::types::conversions::string_to_address;
use crate::valuation::ValuationParams;

#[derive(Debug, Deserialize, Clone)]
pub struct Rpc {
    pub http_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Oracle {
    /// Chainlink FeedRegistry; absent on chains without one
    #[serde(default)]
    pub feed_registry: Option<String>,
    /// L2 sequencer uptime feed; absent on L1
    #[serde(default)]
    pub sequencer_uptime_feed: Option<String>,
    #[serde(default = "default_grace_period_seconds")]
    pub grace_period_seconds: u64,
    #[serde(default = "default_max_feed_age_seconds")]
    pub max_feed_age_seconds: u64,
    #[serde(default = "default_twap_window_seconds")]
    pub twap_window_seconds: u32,
    /// Rescale feeds whose `decimals()` is not 8
    #[serde(default = "default_false")]
    pub feed_decimals_normalization: bool,
}

fn default_false() -> bool {
    false
}
fn default_true() -> bool {
    true
}
fn default_grace_period_seconds() -> u64 {
    DEFAULT_GRACE_PERIOD_SECS
}
fn default_max_feed_age_seconds() -> u64 {
    3600
}
fn default_twap_window_seconds() -> u32 {
    1800 // 30 minutes
}

impl Default for Oracle {
    fn default() -> Self {
        Self {
            feed_registry: None,
            sequencer_uptime_feed: None,
            grace_period_seconds: default_grace_period_seconds(),
            max_feed_age_seconds: default_max_feed_age_seconds(),
            twap_window_seconds: default_twap_window_seconds(),
            feed_decimals_normalization: default_false(),
        }
    }
}

/// Per-token overrides, keyed by token address in `[tokens]`.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct TokenConfig {
    #[serde(default)]
    pub decimals: Option<u8>,
    /// `"ETH"`, `"BTC"`, `"USD"` or an address
    #[serde(default)]
    pub denomination: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub rpc: Rpc,
    #[serde(default)]
    pub oracle: Oracle,
    /// Start from the mainnet WETH/WBTC/USDC/USDT/DAI presets
    #[serde(default = "default_true")]
    pub mainnet_token_defaults: bool,
    #[serde(default)]
    pub tokens: HashMap<String, TokenConfig>,
    /// Direct feed handles: token address -> feed address
    #[serde(default)]
    pub feeds: HashMap<String, String>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load(File::with_name("Config.toml"), |key| env::var(key).ok())
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::load(File::from(path.as_ref()), |key| env::var(key).ok())
    }

    fn load<S, F>(source: S, lookup: F) -> Result<Self, ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
        F: Fn(&str) -> Option<String>,
    {
        let s = Config::builder().add_source(source).build()?;
        let mut settings: Self = s.try_deserialize()?;
        settings.apply_env_overrides(lookup);
        Ok(settings)
    }

    fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(url) = non_empty("SDK_RPC_HTTP_URL") {
            self.rpc.http_url = url;
        }
        if let Some(registry) = non_empty("SDK_ORACLE_FEED_REGISTRY") {
            self.oracle.feed_registry = Some(registry);
        }
        if let Some(feed) = non_empty("SDK_ORACLE_SEQUENCER_UPTIME_FEED") {
            self.oracle.sequencer_uptime_feed = Some(feed);
        }

        // JSON object { token_address: feed_address }, merged over [feeds]
        if let Some(raw) = non_empty("SDK_FEEDS") {
            match serde_json::from_str::<HashMap<String, String>>(&raw) {
                Ok(map) => {
                    for (token, feed) in map {
                        if !token.trim().is_empty() && !feed.trim().is_empty() {
                            self.feeds.insert(token.to_lowercase(), feed);
                        }
                    }
                }
                Err(e) => {
                    log::warn!("⚠️ Failed to parse SDK_FEEDS as JSON: {}", e);
                }
            }
        }
    }

    pub fn feed_registry(&self) -> Result<Option<Address>, ConfigError> {
        parse_optional_address("oracle.feed_registry", self.oracle.feed_registry.as_deref())
    }

    pub fn sequencer_uptime_feed(&self) -> Result<Option<Address>, ConfigError> {
        parse_optional_address(
            "oracle.sequencer_uptime_feed",
            self.oracle.sequencer_uptime_feed.as_deref(),
        )
    }

    pub fn feed_handles(&self) -> Result<HashMap<Address, Address>, ConfigError> {
        self.feeds
            .iter()
            .map(|(token, feed)| {
                Ok((
                    parse_address("feeds", token)?,
                    parse_address("feeds", feed)?,
                ))
            })
            .collect()
    }

    pub fn valuation_params(&self) -> ValuationParams {
        ValuationParams {
            twap_window_secs: self.oracle.twap_window_seconds,
            max_feed_age_secs: self.oracle.max_feed_age_seconds,
        }
    }

    /// Decimal bases and denominations, presets first, `[tokens]` on top.
    pub fn token_registry(&self) -> Result<TokenRegistry, ConfigError> {
        let mut registry = if self.mainnet_token_defaults {
            TokenRegistry::mainnet_defaults()
        } else {
            TokenRegistry::new()
        };

        for (raw, token_config) in &self.tokens {
            let token = parse_address("tokens", raw)?;
            if let Some(decimals) = token_config.decimals {
                registry = registry.with_decimals(token, decimals).map_err(|e| {
                    ConfigError::Message(format!("tokens.{}: decimals {}: {}", raw, decimals, e))
                })?;
            }
            if let Some(denomination) = &token_config.denomination {
                registry = registry.with_denomination(token, parse_denomination(denomination)?);
            }
        }
        Ok(registry)
    }
}

fn parse_address(section: &str, raw: &str) -> Result<Address, ConfigError> {
    string_to_address(raw)
        .map_err(|e| ConfigError::Message(format!("{}: invalid address {:?}: {}", section, raw, e)))
}

fn parse_optional_address(
    section: &str,
    raw: Option<&str>,
) -> Result<Option<Address>, ConfigError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_address(section, value).map(Some),
    }
}

fn parse_denomination(raw: &str) -> Result<Address, ConfigError> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "ETH" => Ok(Denominations::ETH),
        "BTC" => Ok(Denominations::BTC),
        "USD" => Ok(Denominations::USD),
        _ => parse_address("tokens.denomination", raw),
    }
}
