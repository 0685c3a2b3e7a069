// src/valuation.rs

//! # Valuation Engine
//!
//! Combines push-feed prices with the pool's TWAP into a USD value for a
//! concentrated-liquidity position.
//!
//! ## Pricing policy
//!
//! | feeds resolved | token0 price        | token1 price        |
//! |----------------|---------------------|---------------------|
//! | both           | feed                | feed                |
//! | token0 only    | feed                | TWAP x token0 price |
//! | token1 only    | TWAP x token1 price | feed                |
//! | neither        | error               | error               |
//!
//! The error is [`ValuationError::NoChainlinkPriceAvailable`]. When both feeds
//! resolve the pool TWAP is never read and
//! [`ValuationParams::twap_window_secs`] is ignored.
//!
//! ## Entry points
//!
//! The first three discover what they are not given and then run the same
//! computation as the fourth:
//!
//! 1. [`ValuationEngine::value_position`]: tokens from the pool, feeds from the registry.
//! 2. [`ValuationEngine::value_position_with_flags`]: as 1, with per-token flags
//!    that skip the registry read for tokens known to have no feed.
//! 3. [`ValuationEngine::value_position_with_feeds`]: caller feed handles, the
//!    registry (if configured) taking precedence.
//! 4. [`ValuationEngine::value_resolved`]: every input supplied by the caller.
//!
//! Each call reads the clock once, runs the liveness guard, and then performs
//! its reads strictly in order. Any failure aborts the call.

use ethers::types::Address;
use log::{debug, info};
use std::sync::Arc;
use std::time::Instant;

use crate::error::ValuationError;
use crate::feeds::{fetch_price, FeedResolver, ResolvedFeeds};
use crate::liveness::{LivenessGuard, DEFAULT_GRACE_PERIOD_SECS};
use crate::metrics;
use crate::position_value::position_amounts;
use crate::providers::{
    Clock, DecimalsProvider, FeedRegistryProvider, LivenessProvider, PoolStateProvider,
    PriceFeedProvider, ShareTokenProvider,
};
use crate::tokens::TokenRegistry;
use crate::twap::derive_price;
use crate::types::{validate_tick_range, Position, PositionInputs, PricePair, Valuation};

/// Caller tolerances for one valuation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValuationParams {
    /// TWAP window; unused when both tokens have feeds
    pub twap_window_secs: u32,
    pub max_feed_age_secs: u64,
}

impl Default for ValuationParams {
    fn default() -> Self {
        Self {
            twap_window_secs: 1800,
            max_feed_age_secs: 3600,
        }
    }
}

/// How the discovery entry points resolve feeds.
#[derive(Debug, Clone, Copy)]
pub(crate) enum FeedStrategy {
    Registry,
    Flags(bool, bool),
    Handles(Option<Address>, Option<Address>),
}

pub struct ValuationEngine {
    pub(crate) pools: Arc<dyn PoolStateProvider>,
    feeds: Arc<dyn PriceFeedProvider>,
    decimals: Arc<dyn DecimalsProvider>,
    clock: Arc<dyn Clock>,
    tokens: TokenRegistry,
    registry: Option<Arc<dyn FeedRegistryProvider>>,
    liveness: Option<LivenessGuard>,
    grace_period: u64,
    pub(crate) shares: Option<Arc<dyn ShareTokenProvider>>,
}

impl ValuationEngine {
    pub fn new(
        pools: Arc<dyn PoolStateProvider>,
        feeds: Arc<dyn PriceFeedProvider>,
        decimals: Arc<dyn DecimalsProvider>,
        clock: Arc<dyn Clock>,
        tokens: TokenRegistry,
    ) -> Self {
        Self {
            pools,
            feeds,
            decimals,
            clock,
            tokens,
            registry: None,
            liveness: None,
            grace_period: DEFAULT_GRACE_PERIOD_SECS,
            shares: None,
        }
    }

    pub fn with_feed_registry(mut self, registry: Arc<dyn FeedRegistryProvider>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Enables the sequencer liveness check on every call.
    pub fn with_liveness(mut self, provider: Arc<dyn LivenessProvider>) -> Self {
        self.liveness = Some(LivenessGuard::new(provider).with_grace_period(self.grace_period));
        self
    }

    pub fn with_grace_period(mut self, grace_period_secs: u64) -> Self {
        self.grace_period = grace_period_secs;
        self.liveness = self
            .liveness
            .map(|guard| guard.with_grace_period(grace_period_secs));
        self
    }

    pub fn with_share_tokens(mut self, shares: Arc<dyn ShareTokenProvider>) -> Self {
        self.shares = Some(shares);
        self
    }

    pub fn token_registry(&self) -> &TokenRegistry {
        &self.tokens
    }

    /// Entry point 1: tokens from the pool, feeds from the registry.
    ///
    /// Without a configured registry no token has a feed, so this fails with
    /// [`ValuationError::NoChainlinkPriceAvailable`].
    pub async fn value_position(
        &self,
        pool: Address,
        tick_lower: i32,
        tick_upper: i32,
        liquidity: u128,
        params: ValuationParams,
    ) -> Result<Valuation, ValuationError> {
        let call = self.discover_and_value(
            pool,
            tick_lower,
            tick_upper,
            liquidity,
            FeedStrategy::Registry,
            params,
        );
        self.timed("position", call).await
    }

    /// Entry point 2: a `false` flag marks a token as feed-less without a registry read.
    #[allow(clippy::too_many_arguments)]
    pub async fn value_position_with_flags(
        &self,
        pool: Address,
        tick_lower: i32,
        tick_upper: i32,
        liquidity: u128,
        has_feed0: bool,
        has_feed1: bool,
        params: ValuationParams,
    ) -> Result<Valuation, ValuationError> {
        let call = self.discover_and_value(
            pool,
            tick_lower,
            tick_upper,
            liquidity,
            FeedStrategy::Flags(has_feed0, has_feed1),
            params,
        );
        self.timed("position", call).await
    }

    /// Entry point 3: caller feed handles; a registry hit overrides a handle.
    #[allow(clippy::too_many_arguments)]
    pub async fn value_position_with_feeds(
        &self,
        pool: Address,
        tick_lower: i32,
        tick_upper: i32,
        liquidity: u128,
        feed0: Option<Address>,
        feed1: Option<Address>,
        params: ValuationParams,
    ) -> Result<Valuation, ValuationError> {
        let call = self.discover_and_value(
            pool,
            tick_lower,
            tick_upper,
            liquidity,
            FeedStrategy::Handles(feed0, feed1),
            params,
        );
        self.timed("position", call).await
    }

    /// Entry point 4: nothing is discovered or checked against the chain.
    pub async fn value_resolved(
        &self,
        inputs: &PositionInputs,
        params: ValuationParams,
    ) -> Result<Valuation, ValuationError> {
        self.timed("position", async {
            validate_tick_range(inputs.position.tick_lower, inputs.position.tick_upper)?;
            let now = self.begin().await?;
            self.compute(inputs, params, now).await
        })
        .await
    }

    pub(crate) async fn timed<F>(&self, kind: &str, call: F) -> Result<Valuation, ValuationError>
    where
        F: std::future::Future<Output = Result<Valuation, ValuationError>>,
    {
        let started = Instant::now();
        let result = call.await;
        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.kind(),
        };
        metrics::record_valuation(kind, outcome, started.elapsed());
        result
    }

    /// Clock snapshot followed by the liveness check.
    pub(crate) async fn begin(&self) -> Result<u64, ValuationError> {
        let now = self.clock.now().await?;
        if let Some(guard) = &self.liveness {
            guard.check(now).await?;
        }
        Ok(now)
    }

    async fn discover_and_value(
        &self,
        pool: Address,
        tick_lower: i32,
        tick_upper: i32,
        liquidity: u128,
        strategy: FeedStrategy,
        params: ValuationParams,
    ) -> Result<Valuation, ValuationError> {
        validate_tick_range(tick_lower, tick_upper)?;
        let now = self.begin().await?;
        let inputs = self
            .discover(pool, tick_lower, tick_upper, liquidity, strategy)
            .await?;
        self.compute(&inputs, params, now).await
    }

    /// Token order, decimal bases and feeds for a pool position.
    pub(crate) async fn discover(
        &self,
        pool: Address,
        tick_lower: i32,
        tick_upper: i32,
        liquidity: u128,
        strategy: FeedStrategy,
    ) -> Result<PositionInputs, ValuationError> {
        let (token0, token1) = self.pools.tokens(pool).await?;
        let position = Position::new(pool, token0, token1, tick_lower, tick_upper, liquidity)?;

        let base0 = self.tokens.resolve_base(token0, self.decimals.as_ref()).await?;
        let base1 = self.tokens.resolve_base(token1, self.decimals.as_ref()).await?;

        let resolver = FeedResolver::new(self.registry.as_deref(), &self.tokens);
        let feeds = match strategy {
            FeedStrategy::Registry => ResolvedFeeds {
                token0: resolver.via_registry(token0).await,
                token1: resolver.via_registry(token1).await,
            },
            FeedStrategy::Flags(has0, has1) => ResolvedFeeds {
                token0: resolver.via_flag(token0, has0).await,
                token1: resolver.via_flag(token1, has1).await,
            },
            FeedStrategy::Handles(feed0, feed1) => ResolvedFeeds {
                token0: resolver.via_handle(token0, feed0).await,
                token1: resolver.via_handle(token1, feed1).await,
            },
        };
        debug!("Resolved feeds for pool {:?}: {:?}", pool, feeds);

        Ok(PositionInputs {
            position,
            base0,
            base1,
            feeds,
        })
    }

    async fn price_pair(
        &self,
        inputs: &PositionInputs,
        params: ValuationParams,
        now: u64,
    ) -> Result<PricePair, ValuationError> {
        let max_age = params.max_feed_age_secs;
        let window = params.twap_window_secs;
        let pool = inputs.position.pool;
        let feeds = self.feeds.as_ref();

        match (inputs.feeds.token0.handle(), inputs.feeds.token1.handle()) {
            (Some(feed0), Some(feed1)) => {
                metrics::increment_pricing_branch("both_feeds");
                let token0 = fetch_price(feeds, feed0, max_age, now).await?;
                let token1 = fetch_price(feeds, feed1, max_age, now).await?;
                Ok(PricePair { token0, token1 })
            }
            (Some(feed0), None) => {
                metrics::increment_pricing_branch("twap_token1");
                let token0 = fetch_price(feeds, feed0, max_age, now).await?;
                let tick = self.pools.twap_tick(pool, window).await?;
                let token1 =
                    derive_price(&token0, inputs.base0, inputs.base1, false, tick, window)?;
                Ok(PricePair { token0, token1 })
            }
            (None, Some(feed1)) => {
                metrics::increment_pricing_branch("twap_token0");
                let token1 = fetch_price(feeds, feed1, max_age, now).await?;
                let tick = self.pools.twap_tick(pool, window).await?;
                let token0 =
                    derive_price(&token1, inputs.base1, inputs.base0, true, tick, window)?;
                Ok(PricePair { token0, token1 })
            }
            (None, None) => Err(ValuationError::NoChainlinkPriceAvailable),
        }
    }

    pub(crate) async fn compute(
        &self,
        inputs: &PositionInputs,
        params: ValuationParams,
        now: u64,
    ) -> Result<Valuation, ValuationError> {
        let prices = self.price_pair(inputs, params, now).await?;
        let position = &inputs.position;
        let amounts = position_amounts(
            prices.token0.value,
            prices.token1.value,
            inputs.base0,
            inputs.base1,
            position.tick_lower,
            position.tick_upper,
            position.liquidity,
        )?;

        info!(
            "💰 Position {:?} [{}, {}] L={}: amount0={} amount1={} value_usd={}",
            position.pool,
            position.tick_lower,
            position.tick_upper,
            position.liquidity,
            amounts.amount0,
            amounts.amount1,
            amounts.value_usd
        );

        Ok(Valuation {
            value_usd: amounts.value_usd,
            prices: Some(prices),
        })
    }
}
