// src/providers/onchain.rs

//! `ethers`-backed implementations of the provider traits.
//!
//! Every reader is generic over `M: Middleware` and holds an `Arc<M>`, so a
//! single `Provider<Http>` can be shared between all of them.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use ethers::prelude::{Address, BlockNumber, Middleware};
use ethers::types::{H256, I256, U256};
use std::collections::HashMap;
use std::sync::Arc;

use super::{
    Clock, DecimalsProvider, FeedReading, FeedRegistryProvider, LivenessProvider, LivenessStatus,
    PoolStateProvider, PriceFeedProvider, ShareTokenProvider,
};
use crate::contracts::{AggregatorV3Interface, Erc20, FeedRegistry, PositionShareToken, UniswapV3Pool};
use crate::twap::arithmetic_mean_tick;
use crate::types::PRICE_DECIMALS;

fn u256_to_u64(value: U256, what: &str) -> Result<u64> {
    if value > U256::from(u64::MAX) {
        return Err(anyhow!("{} does not fit in u64: {}", what, value));
    }
    Ok(value.as_u64())
}

/// Uniswap V3 pool reader.
pub struct OnchainPoolState<M: Middleware> {
    provider: Arc<M>,
}

impl<M: Middleware + 'static> OnchainPoolState<M> {
    pub fn new(provider: Arc<M>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<M: Middleware + 'static> PoolStateProvider for OnchainPoolState<M> {
    async fn tokens(&self, pool: Address) -> Result<(Address, Address)> {
        let contract = UniswapV3Pool::new(pool, self.provider.clone());
        let token0 = contract
            .token_0()
            .call()
            .await
            .with_context(|| format!("token0() failed for pool {:?}", pool))?;
        let token1 = contract
            .token_1()
            .call()
            .await
            .with_context(|| format!("token1() failed for pool {:?}", pool))?;
        Ok((token0, token1))
    }

    async fn position_liquidity(&self, pool: Address, key: H256) -> Result<u128> {
        let contract = UniswapV3Pool::new(pool, self.provider.clone());
        let (liquidity, _, _, _, _) = contract
            .positions(key.to_fixed_bytes())
            .call()
            .await
            .with_context(|| format!("positions({:?}) failed for pool {:?}", key, pool))?;
        Ok(liquidity)
    }

    async fn twap_tick(&self, pool: Address, window_secs: u32) -> Result<i32> {
        if window_secs == 0 {
            return Err(anyhow!("TWAP window must be positive"));
        }
        let contract = UniswapV3Pool::new(pool, self.provider.clone());
        // observe() reverts with "OLD" when the oldest observation is younger than the window
        let (tick_cumulatives, _) = contract
            .observe(vec![window_secs, 0])
            .call()
            .await
            .with_context(|| format!("observe([{}, 0]) failed for pool {:?}", window_secs, pool))?;
        if tick_cumulatives.len() < 2 {
            return Err(anyhow!(
                "observe returned {} tick cumulatives for pool {:?}",
                tick_cumulatives.len(),
                pool
            ));
        }
        let tick = arithmetic_mean_tick(tick_cumulatives[0], tick_cumulatives[1], window_secs)?;
        log::debug!("📈 TWAP tick for pool {:?} over {}s: {}", pool, window_secs, tick);
        Ok(tick)
    }
}

/// Chainlink aggregator reader.
///
/// With `normalize_decimals` the answer is rescaled from the aggregator's own
/// `decimals()` to [`PRICE_DECIMALS`]; otherwise it is passed through.
pub struct ChainlinkFeeds<M: Middleware> {
    provider: Arc<M>,
    normalize_decimals: bool,
}

impl<M: Middleware + 'static> ChainlinkFeeds<M> {
    pub fn new(provider: Arc<M>) -> Self {
        Self {
            provider,
            normalize_decimals: false,
        }
    }

    pub fn with_decimals_normalization(mut self, enabled: bool) -> Self {
        self.normalize_decimals = enabled;
        self
    }
}

/// Rescales `answer` from `feed_decimals` to [`PRICE_DECIMALS`], truncating toward zero.
pub fn normalize_answer(answer: I256, feed_decimals: u8) -> Result<I256> {
    let target = PRICE_DECIMALS as u32;
    let source = feed_decimals as u32;
    if source == target {
        return Ok(answer);
    }
    let diff = if source > target { source - target } else { target - source };
    let scale = I256::from(10i64)
        .checked_pow(diff)
        .ok_or_else(|| anyhow!("feed decimals {} out of range", feed_decimals))?;
    if source > target {
        Ok(answer / scale)
    } else {
        answer
            .checked_mul(scale)
            .ok_or_else(|| anyhow!("feed answer {} overflows when scaled to {} decimals", answer, target))
    }
}

#[async_trait]
impl<M: Middleware + 'static> PriceFeedProvider for ChainlinkFeeds<M> {
    async fn latest_price(&self, feed: Address) -> Result<FeedReading> {
        let aggregator = AggregatorV3Interface::new(feed, self.provider.clone());
        let (_, answer, _, updated_at, _) = aggregator
            .latest_round_data()
            .call()
            .await
            .with_context(|| format!("latestRoundData() failed for feed {:?}", feed))?;

        let answer = if self.normalize_decimals {
            let decimals = aggregator
                .decimals()
                .call()
                .await
                .with_context(|| format!("decimals() failed for feed {:?}", feed))?;
            normalize_answer(answer, decimals)?
        } else {
            answer
        };

        Ok(FeedReading {
            answer,
            updated_at: u256_to_u64(updated_at, "updatedAt")?,
        })
    }
}

/// Chainlink FeedRegistry reader.
pub struct ChainlinkFeedRegistry<M: Middleware> {
    provider: Arc<M>,
    registry: Address,
}

impl<M: Middleware + 'static> ChainlinkFeedRegistry<M> {
    pub fn new(provider: Arc<M>, registry: Address) -> Self {
        Self { provider, registry }
    }
}

#[async_trait]
impl<M: Middleware + 'static> FeedRegistryProvider for ChainlinkFeedRegistry<M> {
    async fn feed_for(&self, base: Address, quote: Address) -> Result<Option<Address>> {
        let contract = FeedRegistry::new(self.registry, self.provider.clone());
        // Unknown pairs revert; the engine treats that error as "no feed"
        let feed = contract
            .get_feed(base, quote)
            .call()
            .await
            .with_context(|| format!("getFeed({:?}, {:?}) failed", base, quote))?;
        if feed == Address::zero() {
            Ok(None)
        } else {
            Ok(Some(feed))
        }
    }
}

/// L2 sequencer uptime feed reader.
pub struct SequencerUptimeFeed<M: Middleware> {
    provider: Arc<M>,
    feed: Address,
}

impl<M: Middleware + 'static> SequencerUptimeFeed<M> {
    pub fn new(provider: Arc<M>, feed: Address) -> Self {
        Self { provider, feed }
    }
}

#[async_trait]
impl<M: Middleware + 'static> LivenessProvider for SequencerUptimeFeed<M> {
    async fn latest_status(&self) -> Result<LivenessStatus> {
        let aggregator = AggregatorV3Interface::new(self.feed, self.provider.clone());
        let (_, answer, started_at, _, _) = aggregator
            .latest_round_data()
            .call()
            .await
            .with_context(|| format!("latestRoundData() failed for uptime feed {:?}", self.feed))?;
        Ok(LivenessStatus {
            is_down: !answer.is_zero(),
            status_since: u256_to_u64(started_at, "startedAt")?,
        })
    }
}

/// ERC20 `decimals()` reader.
pub struct Erc20Decimals<M: Middleware> {
    provider: Arc<M>,
}

impl<M: Middleware + 'static> Erc20Decimals<M> {
    pub fn new(provider: Arc<M>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<M: Middleware + 'static> DecimalsProvider for Erc20Decimals<M> {
    async fn decimals(&self, token: Address) -> Result<u8> {
        Erc20::new(token, self.provider.clone())
            .decimals()
            .call()
            .await
            .with_context(|| format!("decimals() failed for token {:?}", token))
    }
}

/// Reader for share tokens wrapping a single pool position.
///
/// The position is assumed to be owned by the share token itself unless an
/// owner is registered with [`OnchainShareToken::with_position_owner`], e.g.
/// when a separate manager contract holds the liquidity.
pub struct OnchainShareToken<M: Middleware> {
    provider: Arc<M>,
    owners: HashMap<Address, Address>,
}

impl<M: Middleware + 'static> OnchainShareToken<M> {
    pub fn new(provider: Arc<M>) -> Self {
        Self {
            provider,
            owners: HashMap::new(),
        }
    }

    pub fn with_position_owner(mut self, share_token: Address, owner: Address) -> Self {
        self.owners.insert(share_token, owner);
        self
    }

    fn contract(&self, share_token: Address) -> PositionShareToken<M> {
        PositionShareToken::new(share_token, self.provider.clone())
    }
}

#[async_trait]
impl<M: Middleware + 'static> ShareTokenProvider for OnchainShareToken<M> {
    async fn total_share_supply(&self, share_token: Address) -> Result<U256> {
        self.contract(share_token)
            .total_supply()
            .call()
            .await
            .with_context(|| format!("totalSupply() failed for share token {:?}", share_token))
    }

    async fn tick_range(&self, share_token: Address) -> Result<(i32, i32)> {
        let contract = self.contract(share_token);
        let lower = contract
            .tick_lower()
            .call()
            .await
            .with_context(|| format!("tickLower() failed for share token {:?}", share_token))?;
        let upper = contract
            .tick_upper()
            .call()
            .await
            .with_context(|| format!("tickUpper() failed for share token {:?}", share_token))?;
        Ok((lower, upper))
    }

    async fn pool(&self, share_token: Address) -> Result<Address> {
        self.contract(share_token)
            .pool()
            .call()
            .await
            .with_context(|| format!("pool() failed for share token {:?}", share_token))
    }

    async fn position_owner(&self, share_token: Address) -> Result<Address> {
        Ok(self.owners.get(&share_token).copied().unwrap_or(share_token))
    }
}

/// Uses the latest block's timestamp as "now".
pub struct BlockTimestampClock<M: Middleware> {
    provider: Arc<M>,
}

impl<M: Middleware + 'static> BlockTimestampClock<M> {
    pub fn new(provider: Arc<M>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<M: Middleware + 'static> Clock for BlockTimestampClock<M> {
    async fn now(&self) -> Result<u64> {
        let block = self
            .provider
            .get_block(BlockNumber::Latest)
            .await
            .map_err(|e| anyhow!("get_block(latest) failed: {}", e))?
            .ok_or_else(|| anyhow!("latest block not available"))?;
        u256_to_u64(block.timestamp, "block timestamp")
    }
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    async fn now(&self) -> Result<u64> {
        let ts = chrono::Utc::now().timestamp();
        u64::try_from(ts).map_err(|_| anyhow!("system clock before unix epoch: {}", ts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::providers::Provider;

    #[test]
    fn normalize_answer_scales_both_ways() {
        let answer = I256::from(200_000_000_000i64);
        assert_eq!(normalize_answer(answer, 8).unwrap(), answer);
        assert_eq!(
            normalize_answer(I256::from(2_000_000_000_000_000_000_000i128), 18).unwrap(),
            answer
        );
        assert_eq!(normalize_answer(I256::from(2000i64), 0).unwrap(), answer);
    }

    #[test]
    fn normalize_answer_truncates_toward_zero() {
        assert_eq!(normalize_answer(I256::from(199i64), 10).unwrap(), I256::from(1i64));
        assert_eq!(normalize_answer(I256::from(-199i64), 10).unwrap(), I256::from(-1i64));
    }

    #[test]
    fn u256_to_u64_rejects_overflow() {
        assert_eq!(u256_to_u64(U256::from(42u64), "x").unwrap(), 42);
        assert!(u256_to_u64(U256::from(u64::MAX) + 1, "x").is_err());
    }

    #[tokio::test]
    async fn share_token_position_owner_defaults_to_token() {
        let (provider, _mock) = Provider::mocked();
        let token = Address::repeat_byte(0x5e);
        let manager = Address::repeat_byte(0x77);
        let other = Address::repeat_byte(0x5f);

        let shares = OnchainShareToken::new(Arc::new(provider)).with_position_owner(token, manager);
        assert_eq!(shares.position_owner(token).await.unwrap(), manager);
        assert_eq!(shares.position_owner(other).await.unwrap(), other);
    }

    #[tokio::test]
    async fn system_clock_is_after_2020() {
        assert!(SystemClock.now().await.unwrap() > 1_577_836_800);
    }
}
