//! # LP Valuation SDK
//!
//! Manipulation-resistant USD valuation of Uniswap V3-style concentrated
//! liquidity positions and of share tokens wrapping such a position.
//!
//! ## Overview
//!
//! A position's value cannot be read from the pool's spot price without
//! exposing it to single-transaction manipulation. The SDK instead anchors it
//! to Chainlink-style push feeds and, when only one of the two tokens has a
//! feed, derives the other token's price from the pool's own TWAP:
//!
//! - **Token Normalizer** ([`tokens`]): decimal bases and feed denominations
//! - **Liveness Guard** ([`liveness`]): L2 sequencer uptime and grace period
//! - **Feed Resolver / Price Fetcher** ([`feeds`]): registry or direct handles, staleness
//! - **TWAP Fallback** ([`twap`]): cross-rate from the mean tick
//! - **Valuation Combiner** ([`valuation`]): the three-way pricing policy
//! - **Liquidity-to-Amount Converter** ([`position_value`]): amounts and USD sum
//! - **LP Share Normalizer** ([`share_valuation`]): per-share liquidity
//!
//! The engine is stateless and read-only. Every call re-reads its inputs from
//! the [`providers`], in order, and fails fast on the first error.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ethers::prelude::{Http, Provider};
//! use lp_valuation_sdk::providers::onchain::*;
//! use lp_valuation_sdk::{tokens::TokenRegistry, ValuationEngine, ValuationParams};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let provider = Arc::new(Provider::<Http>::try_from("http://localhost:8545")?);
//! let engine = ValuationEngine::new(
//!     Arc::new(OnchainPoolState::new(provider.clone())),
//!     Arc::new(ChainlinkFeeds::new(provider.clone())),
//!     Arc::new(Erc20Decimals::new(provider.clone())),
//!     Arc::new(BlockTimestampClock::new(provider.clone())),
//!     TokenRegistry::mainnet_defaults(),
//! )
//! .with_feed_registry(Arc::new(ChainlinkFeedRegistry::new(
//!     provider.clone(),
//!     "0x47Fb2585D2C56Fe188D0E6ec628a38b74fCeeeDf".parse()?,
//! )));
//!
//! let pool = "0x88e6A0c2dDD26FEEb64F039a2c41296FcB3f5640".parse()?;
//! let valuation = engine
//!     .value_position(pool, -200_000, -190_000, 10u128.pow(15), ValuationParams::default())
//!     .await?;
//! println!("{} USD", valuation.value_usd_decimal()?);
//! # Ok(())
//! # }
//! ```

// Core Types
/// Position, price and valuation value types
pub mod types;
/// Error taxonomy
pub mod error;
/// Uniswap V3 fixed-point math
pub mod v3_math;

// Valuation Engine
/// Decimal bases and feed denominations
pub mod tokens;
/// Sequencer liveness guard
pub mod liveness;
/// Feed resolution and price fetching
pub mod feeds;
/// TWAP-derived prices
pub mod twap;
/// Liquidity-to-amount conversion
pub mod position_value;
/// Pricing policy and position entry points
pub mod valuation;
/// Share token entry points
pub mod share_valuation;

// Infrastructure
/// Provider traits and on-chain implementations
pub mod providers;
/// Smart contract ABIs (read-only)
pub mod contracts;
/// Metrics and observability
pub mod metrics;

// Settings & Configuration
/// Configuration management
pub mod settings;

// Re-exports for convenience
pub use error::ValuationError;
pub use settings::Settings;
pub use share_valuation::ShareTokenInputs;
pub use types::{Position, PositionInputs, Valuation};
pub use valuation::{ValuationEngine, ValuationParams};
