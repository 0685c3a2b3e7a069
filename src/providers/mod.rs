//! # Provider Interfaces
//!
//! Read-only collaborators the valuation engine consumes. Every method is a
//! single atomic snapshot read; the engine never retries and never caches a
//! result across calls.
//!
//! All methods return [`anyhow::Result`] so that provider-level failures (a
//! pool without enough observation history, a token without `decimals()`, an
//! RPC timeout) reach the caller unchanged inside
//! [`crate::error::ValuationError::Provider`].
//!
//! On-chain implementations backed by `ethers` live in [`onchain`].

use anyhow::Result;
use async_trait::async_trait;
use ethers::types::{Address, H256, I256, U256};

pub mod onchain;

/// Raw reading of a push-price feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedReading {
    /// Signed answer, 8 decimals for USD feeds
    pub answer: I256,
    /// Unix timestamp of the feed's last update
    pub updated_at: u64,
}

/// Latest status reported by a sequencer uptime feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessStatus {
    pub is_down: bool,
    /// Unix timestamp since which the current status holds
    pub status_since: u64,
}

#[async_trait]
pub trait PoolStateProvider: Send + Sync {
    /// `(token0, token1)` of the pool
    async fn tokens(&self, pool: Address) -> Result<(Address, Address)>;

    /// Liquidity of the position stored under `key`
    async fn position_liquidity(&self, pool: Address, key: H256) -> Result<u128>;

    /// Arithmetic-mean tick over the trailing `window_secs` seconds.
    ///
    /// Fails when the pool has no observation old enough to cover the window.
    async fn twap_tick(&self, pool: Address, window_secs: u32) -> Result<i32>;
}

#[async_trait]
pub trait PriceFeedProvider: Send + Sync {
    async fn latest_price(&self, feed: Address) -> Result<FeedReading>;
}

/// Central feed registry keyed by `(base, quote)` denominations.
#[async_trait]
pub trait FeedRegistryProvider: Send + Sync {
    /// `Ok(None)` when the registry has no entry for the pair
    async fn feed_for(&self, base: Address, quote: Address) -> Result<Option<Address>>;
}

#[async_trait]
pub trait LivenessProvider: Send + Sync {
    async fn latest_status(&self) -> Result<LivenessStatus>;
}

#[async_trait]
pub trait DecimalsProvider: Send + Sync {
    async fn decimals(&self, token: Address) -> Result<u8>;
}

/// A token representing fractional ownership of a single pool position.
#[async_trait]
pub trait ShareTokenProvider: Send + Sync {
    async fn total_share_supply(&self, share_token: Address) -> Result<U256>;

    /// `(tick_lower, tick_upper)` of the wrapped position
    async fn tick_range(&self, share_token: Address) -> Result<(i32, i32)>;

    async fn pool(&self, share_token: Address) -> Result<Address>;

    /// Owner of the wrapped position in the pool; the share token itself by default.
    async fn position_owner(&self, share_token: Address) -> Result<Address> {
        Ok(share_token)
    }
}

/// Source of "now", in unix seconds.
#[async_trait]
pub trait Clock: Send + Sync {
    async fn now(&self) -> Result<u64>;
}
