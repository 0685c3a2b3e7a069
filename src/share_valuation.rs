// src/share_valuation.rs

//! Valuation of share tokens wrapping a single pool position.
//!
//! A share token's value is the value of the liquidity backing one whole
//! share (`10^18` share units). The four entry points mirror the position
//! ones in [`crate::valuation`].

use ethers::types::{Address, U256};
use log::debug;
use std::sync::Arc;

use crate::error::ValuationError;
use crate::feeds::ResolvedFeeds;
use crate::providers::ShareTokenProvider;
use crate::tokens::DecimalBase;
use crate::types::{validate_tick_range, Position, PositionInputs, Valuation};
use crate::v3_math::{mul_div, position_key, MathError};
use crate::valuation::{FeedStrategy, ValuationEngine, ValuationParams};

/// Share units in one whole share
const SHARE_UNIT: u128 = 1_000_000_000_000_000_000;

/// `floor(total_liquidity * 10^18 / total_supply)`
pub fn per_share_liquidity(total_liquidity: u128, total_supply: U256) -> Result<u128, MathError> {
    if total_supply.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    let liquidity = mul_div(
        U256::from(total_liquidity),
        U256::from(SHARE_UNIT),
        total_supply,
    )?;
    if liquidity > U256::from(u128::MAX) {
        return Err(MathError::Overflow);
    }
    Ok(liquidity.as_u128())
}

/// Caller-supplied inputs for a share token; tick range and liquidity are
/// still read from the share token and its pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareTokenInputs {
    pub share_token: Address,
    pub pool: Address,
    pub token0: Address,
    pub token1: Address,
    pub base0: DecimalBase,
    pub base1: DecimalBase,
    pub feeds: ResolvedFeeds,
}

/// What a share token wraps, read once per call.
struct WrappedPosition {
    pool: Address,
    tick_lower: i32,
    tick_upper: i32,
    per_share_liquidity: u128,
}

impl ValuationEngine {
    /// Share entry point 1: everything discovered, feeds from the registry.
    pub async fn value_share(
        &self,
        share_token: Address,
        params: ValuationParams,
    ) -> Result<Valuation, ValuationError> {
        let call = self.discover_and_value_share(share_token, FeedStrategy::Registry, params);
        self.timed("share", call).await
    }

    /// Share entry point 2: a `false` flag skips the registry read for that token.
    pub async fn value_share_with_flags(
        &self,
        share_token: Address,
        has_feed0: bool,
        has_feed1: bool,
        params: ValuationParams,
    ) -> Result<Valuation, ValuationError> {
        let call = self.discover_and_value_share(
            share_token,
            FeedStrategy::Flags(has_feed0, has_feed1),
            params,
        );
        self.timed("share", call).await
    }

    /// Share entry point 3: caller feed handles; a registry hit overrides a handle.
    pub async fn value_share_with_feeds(
        &self,
        share_token: Address,
        feed0: Option<Address>,
        feed1: Option<Address>,
        params: ValuationParams,
    ) -> Result<Valuation, ValuationError> {
        let call =
            self.discover_and_value_share(share_token, FeedStrategy::Handles(feed0, feed1), params);
        self.timed("share", call).await
    }

    /// Share entry point 4: pool, tokens, bases and feeds from the caller.
    pub async fn value_share_resolved(
        &self,
        inputs: &ShareTokenInputs,
        params: ValuationParams,
    ) -> Result<Valuation, ValuationError> {
        let call = async {
            let shares = self.share_provider()?;
            let Some(supply) = self.share_supply(shares.as_ref(), inputs.share_token).await? else {
                return Ok(Valuation::zero());
            };
            let now = self.begin().await?;
            let wrapped = self
                .read_wrapped(shares.as_ref(), inputs.share_token, supply, Some(inputs.pool))
                .await?;

            let position = Position::new(
                wrapped.pool,
                inputs.token0,
                inputs.token1,
                wrapped.tick_lower,
                wrapped.tick_upper,
                wrapped.per_share_liquidity,
            )?;
            let resolved = PositionInputs {
                position,
                base0: inputs.base0,
                base1: inputs.base1,
                feeds: inputs.feeds,
            };
            self.compute(&resolved, params, now).await
        };
        self.timed("share", call).await
    }

    fn share_provider(&self) -> Result<Arc<dyn ShareTokenProvider>, ValuationError> {
        self.shares
            .clone()
            .ok_or(ValuationError::MissingProvider("share token"))
    }

    async fn discover_and_value_share(
        &self,
        share_token: Address,
        strategy: FeedStrategy,
        params: ValuationParams,
    ) -> Result<Valuation, ValuationError> {
        let shares = self.share_provider()?;
        let Some(supply) = self.share_supply(shares.as_ref(), share_token).await? else {
            return Ok(Valuation::zero());
        };
        let now = self.begin().await?;
        let wrapped = self
            .read_wrapped(shares.as_ref(), share_token, supply, None)
            .await?;

        let inputs = self
            .discover(
                wrapped.pool,
                wrapped.tick_lower,
                wrapped.tick_upper,
                wrapped.per_share_liquidity,
                strategy,
            )
            .await?;
        self.compute(&inputs, params, now).await
    }

    /// `None` when the share supply is zero. Read ahead of the clock and the
    /// liveness guard: an empty wrapper values to 0 without any price.
    async fn share_supply(
        &self,
        shares: &dyn ShareTokenProvider,
        share_token: Address,
    ) -> Result<Option<U256>, ValuationError> {
        let supply = shares.total_share_supply(share_token).await?;
        if supply.is_zero() {
            debug!("Share token {:?} has zero supply, valuing at 0", share_token);
            return Ok(None);
        }
        Ok(Some(supply))
    }

    async fn read_wrapped(
        &self,
        shares: &dyn ShareTokenProvider,
        share_token: Address,
        supply: U256,
        pool: Option<Address>,
    ) -> Result<WrappedPosition, ValuationError> {
        let (tick_lower, tick_upper) = shares.tick_range(share_token).await?;
        validate_tick_range(tick_lower, tick_upper)?;
        let pool = match pool {
            Some(pool) => pool,
            None => shares.pool(share_token).await?,
        };
        let owner = shares.position_owner(share_token).await?;

        let key = position_key(owner, tick_lower, tick_upper);
        let total_liquidity = self.pools.position_liquidity(pool, key).await?;
        let per_share_liquidity = per_share_liquidity(total_liquidity, supply)?;
        debug!(
            "Share token {:?}: supply {} total liquidity {} per-share liquidity {}",
            share_token, supply, total_liquidity, per_share_liquidity
        );

        Ok(WrappedPosition {
            pool,
            tick_lower,
            tick_upper,
            per_share_liquidity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_share_liquidity_floors() {
        let supply = U256::from(3u64) * U256::exp10(18);
        assert_eq!(per_share_liquidity(10, supply).unwrap(), 3);
        assert_eq!(
            per_share_liquidity(1_000_000, U256::exp10(18)).unwrap(),
            1_000_000
        );
        assert_eq!(per_share_liquidity(0, supply).unwrap(), 0);
    }

    #[test]
    fn test_per_share_liquidity_limits() {
        assert_eq!(
            per_share_liquidity(1, U256::zero()),
            Err(MathError::DivisionByZero)
        );
        assert_eq!(
            per_share_liquidity(u128::MAX, U256::one()),
            Err(MathError::Overflow)
        );
    }
}
