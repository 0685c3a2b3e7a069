//! In-memory providers for driving `ValuationEngine` in integration tests.

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ethers::types::{Address, H256, I256, U256};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use lp_valuation_sdk::providers::{
    Clock, DecimalsProvider, FeedReading, FeedRegistryProvider, LivenessProvider, LivenessStatus,
    PoolStateProvider, PriceFeedProvider, ShareTokenProvider,
};
use lp_valuation_sdk::tokens::{Denominations, TokenRegistry};
use lp_valuation_sdk::ValuationEngine;

pub const NOW: u64 = 1_700_000_000;

pub fn pool() -> Address {
    Address::repeat_byte(0x50)
}
/// 18-decimal token (WETH-like)
pub fn token18() -> Address {
    Address::repeat_byte(0x18)
}
/// 6-decimal token (USDC-like)
pub fn token6() -> Address {
    Address::repeat_byte(0x06)
}
pub fn feed_a() -> Address {
    Address::repeat_byte(0xa0)
}
pub fn feed_b() -> Address {
    Address::repeat_byte(0xb0)
}
pub fn share_token() -> Address {
    Address::repeat_byte(0x5e)
}

pub fn price_e8(usd: i64) -> I256 {
    I256::from(usd) * I256::from(100_000_000i64)
}

pub struct MockPool {
    pub token0: Address,
    pub token1: Address,
    /// `None` means not enough observation history
    pub twap: Option<i32>,
    pub liquidity: HashMap<H256, u128>,
    pub token_calls: AtomicUsize,
    pub twap_calls: AtomicUsize,
    pub liquidity_calls: AtomicUsize,
}

impl MockPool {
    pub fn new(token0: Address, token1: Address) -> Self {
        Self {
            token0,
            token1,
            twap: None,
            liquidity: HashMap::new(),
            token_calls: AtomicUsize::new(0),
            twap_calls: AtomicUsize::new(0),
            liquidity_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_twap(mut self, tick: i32) -> Self {
        self.twap = Some(tick);
        self
    }

    pub fn with_position(mut self, key: H256, liquidity: u128) -> Self {
        self.liquidity.insert(key, liquidity);
        self
    }

    pub fn twap_calls(&self) -> usize {
        self.twap_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PoolStateProvider for MockPool {
    async fn tokens(&self, _pool: Address) -> Result<(Address, Address)> {
        self.token_calls.fetch_add(1, Ordering::SeqCst);
        Ok((self.token0, self.token1))
    }

    async fn position_liquidity(&self, _pool: Address, key: H256) -> Result<u128> {
        self.liquidity_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.liquidity.get(&key).copied().unwrap_or(0))
    }

    async fn twap_tick(&self, _pool: Address, window_secs: u32) -> Result<i32> {
        self.twap_calls.fetch_add(1, Ordering::SeqCst);
        if window_secs == 0 {
            return Err(anyhow!("TWAP window must be positive"));
        }
        self.twap.ok_or_else(|| anyhow!("OLD"))
    }
}

#[derive(Default)]
pub struct MockFeeds {
    pub readings: HashMap<Address, FeedReading>,
    pub calls: AtomicUsize,
}

impl MockFeeds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, feed: Address, answer: I256, updated_at: u64) -> Self {
        self.readings.insert(feed, FeedReading { answer, updated_at });
        self
    }
}

#[async_trait]
impl PriceFeedProvider for MockFeeds {
    async fn latest_price(&self, feed: Address) -> Result<FeedReading> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.readings
            .get(&feed)
            .copied()
            .ok_or_else(|| anyhow!("no round data for {:?}", feed))
    }
}

/// Registry keyed by base denomination; lookups for `failing` bases revert.
#[derive(Default)]
pub struct MockRegistry {
    pub feeds: HashMap<Address, Address>,
    pub failing: HashSet<Address>,
    pub queried: std::sync::Mutex<Vec<Address>>,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, base: Address, feed: Address) -> Self {
        self.feeds.insert(base, feed);
        self
    }

    pub fn failing(mut self, base: Address) -> Self {
        self.failing.insert(base);
        self
    }

    pub fn calls(&self) -> usize {
        self.queried.lock().unwrap().len()
    }

    pub fn queried(&self) -> Vec<Address> {
        self.queried.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedRegistryProvider for MockRegistry {
    async fn feed_for(&self, base: Address, quote: Address) -> Result<Option<Address>> {
        self.queried.lock().unwrap().push(base);
        if quote != Denominations::USD {
            return Err(anyhow!("unexpected quote {:?}", quote));
        }
        if self.failing.contains(&base) {
            return Err(anyhow!("Feed not found"));
        }
        Ok(self.feeds.get(&base).copied())
    }
}

pub struct MockLiveness(pub LivenessStatus);

impl MockLiveness {
    pub fn up_since(since: u64) -> Self {
        Self(LivenessStatus {
            is_down: false,
            status_since: since,
        })
    }

    pub fn down_since(since: u64) -> Self {
        Self(LivenessStatus {
            is_down: true,
            status_since: since,
        })
    }
}

#[async_trait]
impl LivenessProvider for MockLiveness {
    async fn latest_status(&self) -> Result<LivenessStatus> {
        Ok(self.0)
    }
}

#[derive(Default)]
pub struct MockDecimals {
    pub decimals: HashMap<Address, u8>,
    pub calls: AtomicUsize,
}

impl MockDecimals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, token: Address, decimals: u8) -> Self {
        self.decimals.insert(token, decimals);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DecimalsProvider for MockDecimals {
    async fn decimals(&self, token: Address) -> Result<u8> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.decimals
            .get(&token)
            .copied()
            .ok_or_else(|| anyhow!("decimals() reverted for {:?}", token))
    }
}

pub struct MockShares {
    pub supply: U256,
    pub tick_range: (i32, i32),
    pub pool: Address,
    /// `None` keys the position by the share token itself
    pub owner: Option<Address>,
    pub calls: AtomicUsize,
}

impl MockShares {
    pub fn new(supply: U256, tick_range: (i32, i32)) -> Self {
        Self {
            supply,
            tick_range,
            pool: pool(),
            owner: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_owner(mut self, owner: Address) -> Self {
        self.owner = Some(owner);
        self
    }
}

#[async_trait]
impl ShareTokenProvider for MockShares {
    async fn total_share_supply(&self, _share_token: Address) -> Result<U256> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.supply)
    }

    async fn tick_range(&self, _share_token: Address) -> Result<(i32, i32)> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.tick_range)
    }

    async fn pool(&self, _share_token: Address) -> Result<Address> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.pool)
    }

    async fn position_owner(&self, share_token: Address) -> Result<Address> {
        Ok(self.owner.unwrap_or(share_token))
    }
}

pub struct FixedClock(pub u64);

#[async_trait]
impl Clock for FixedClock {
    async fn now(&self) -> Result<u64> {
        Ok(self.0)
    }
}

/// Registry knowing both test tokens' bases.
pub fn token_registry() -> TokenRegistry {
    TokenRegistry::new()
        .with_decimals(token18(), 18)
        .unwrap()
        .with_decimals(token6(), 6)
        .unwrap()
}

pub fn engine(pool: &Arc<MockPool>, feeds: MockFeeds) -> ValuationEngine {
    ValuationEngine::new(
        pool.clone(),
        Arc::new(feeds),
        Arc::new(MockDecimals::new()),
        Arc::new(FixedClock(NOW)),
        token_registry(),
    )
}
