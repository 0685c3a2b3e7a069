//! Integration tests for share token valuation.

mod common;

use common::*;
use ethers::types::{Address, U256};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use lp_valuation_sdk::feeds::{FeedAvailability, ResolvedFeeds};
use lp_valuation_sdk::tokens::DecimalBase;
use lp_valuation_sdk::v3_math::position_key;
use lp_valuation_sdk::{ShareTokenInputs, ValuationEngine, ValuationError, ValuationParams};

fn feeds() -> MockFeeds {
    MockFeeds::new()
        .with(feed_a(), price_e8(2000), NOW)
        .with(feed_b(), price_e8(1), NOW)
}

fn share_engine(pool_state: &Arc<MockPool>, shares: &Arc<MockShares>) -> ValuationEngine {
    engine(pool_state, feeds()).with_share_tokens(shares.clone())
}

fn wrapped_pool(total_liquidity: u128) -> MockPool {
    MockPool::new(token18(), token6())
        .with_position(position_key(share_token(), -1000, 1000), total_liquidity)
}

#[tokio::test]
async fn test_zero_supply_values_to_zero_without_reads() {
    let pool_state = Arc::new(wrapped_pool(1_000_000));
    let shares = Arc::new(MockShares::new(U256::zero(), (-1000, 1000)));
    let engine = share_engine(&pool_state, &shares);

    // No feeds given: a computed valuation would fail
    let valuation = engine
        .value_share_with_feeds(share_token(), None, None, ValuationParams::default())
        .await
        .unwrap();

    assert_eq!(valuation.value_usd, U256::zero());
    assert!(valuation.prices.is_none());
    assert_eq!(pool_state.liquidity_calls.load(Ordering::SeqCst), 0);
    assert_eq!(pool_state.token_calls.load(Ordering::SeqCst), 0);
    assert_eq!(shares.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_one_share_of_exact_split() {
    // 3 shares over 3e15 liquidity: one share holds 1e15
    let pool_state = Arc::new(wrapped_pool(3_000_000_000_000_000));
    let shares = Arc::new(MockShares::new(
        U256::from(3u64) * U256::exp10(18),
        (-1000, 1000),
    ));
    let engine = share_engine(&pool_state, &shares);

    let valuation = engine
        .value_share_with_feeds(
            share_token(),
            Some(feed_a()),
            Some(feed_b()),
            ValuationParams::default(),
        )
        .await
        .unwrap();

    assert_eq!(valuation.value_usd, U256::from(200_073_331_916_090_000u64));
    assert_eq!(pool_state.liquidity_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_per_share_liquidity_is_floored() {
    // floor(1e16 * 1e18 / 7e18) = 1428571428571428
    let pool_state = Arc::new(wrapped_pool(10_000_000_000_000_000));
    let shares = Arc::new(MockShares::new(
        U256::from(7u64) * U256::exp10(18),
        (-1000, 1000),
    ));
    let engine = share_engine(&pool_state, &shares);

    let valuation = engine
        .value_share_with_feeds(
            share_token(),
            Some(feed_a()),
            Some(feed_b()),
            ValuationParams::default(),
        )
        .await
        .unwrap();

    assert_eq!(valuation.value_usd, U256::from(285_819_045_594_414_000u64));
}

#[tokio::test]
async fn test_share_registry_and_flag_paths() {
    let pool_state = Arc::new(wrapped_pool(3_000_000_000_000_000));
    let shares = Arc::new(MockShares::new(
        U256::from(3u64) * U256::exp10(18),
        (-1000, 1000),
    ));
    let registry = Arc::new(
        MockRegistry::new()
            .with(token18(), feed_a())
            .with(token6(), feed_b()),
    );
    let engine = share_engine(&pool_state, &shares).with_feed_registry(registry.clone());

    let by_registry = engine
        .value_share(share_token(), ValuationParams::default())
        .await
        .unwrap();
    let by_flags = engine
        .value_share_with_flags(share_token(), true, true, ValuationParams::default())
        .await
        .unwrap();

    assert_eq!(by_registry.value_usd, U256::from(200_073_331_916_090_000u64));
    assert_eq!(by_registry, by_flags);
    assert_eq!(registry.calls(), 4);
}

#[tokio::test]
async fn test_share_resolved_inputs() {
    let pool_state = Arc::new(wrapped_pool(3_000_000_000_000_000));
    let shares = Arc::new(MockShares::new(
        U256::from(3u64) * U256::exp10(18),
        (-1000, 1000),
    ));
    let engine = share_engine(&pool_state, &shares);

    let inputs = ShareTokenInputs {
        share_token: share_token(),
        pool: pool(),
        token0: token18(),
        token1: token6(),
        base0: DecimalBase::from_decimals(18).unwrap(),
        base1: DecimalBase::from_decimals(6).unwrap(),
        feeds: ResolvedFeeds {
            token0: FeedAvailability::Direct(feed_a()),
            token1: FeedAvailability::Direct(feed_b()),
        },
    };

    let valuation = engine
        .value_share_resolved(&inputs, ValuationParams::default())
        .await
        .unwrap();
    assert_eq!(valuation.value_usd, U256::from(200_073_331_916_090_000u64));
    // pool comes from the inputs: supply + tick range only
    assert_eq!(shares.calls.load(Ordering::SeqCst), 2);
    assert_eq!(pool_state.token_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_share_liveness_runs_before_position_reads() {
    let pool_state = Arc::new(wrapped_pool(1));
    let shares = Arc::new(MockShares::new(U256::one(), (-1000, 1000)));
    let engine = share_engine(&pool_state, &shares)
        .with_liveness(Arc::new(MockLiveness::down_since(NOW)));

    let err = engine
        .value_share(share_token(), ValuationParams::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ValuationError::SequencerDown));
    // supply only; no tick range, pool or liquidity reads
    assert_eq!(shares.calls.load(Ordering::SeqCst), 1);
    assert_eq!(pool_state.liquidity_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_zero_supply_values_to_zero_while_sequencer_down() {
    let pool_state = Arc::new(wrapped_pool(1_000_000));
    let shares = Arc::new(MockShares::new(U256::zero(), (-1000, 1000)));
    let engine = share_engine(&pool_state, &shares)
        .with_liveness(Arc::new(MockLiveness::down_since(NOW)));

    let by_registry = engine
        .value_share(share_token(), ValuationParams::default())
        .await
        .unwrap();
    assert_eq!(by_registry.value_usd, U256::zero());

    // recently restarted sequencer: still inside the grace period
    let engine = share_engine(&pool_state, &shares)
        .with_liveness(Arc::new(MockLiveness::up_since(NOW - 10)));
    let inputs = ShareTokenInputs {
        share_token: share_token(),
        pool: pool(),
        token0: token18(),
        token1: token6(),
        base0: DecimalBase::from_decimals(18).unwrap(),
        base1: DecimalBase::from_decimals(6).unwrap(),
        feeds: ResolvedFeeds {
            token0: FeedAvailability::Direct(feed_a()),
            token1: FeedAvailability::Direct(feed_b()),
        },
    };
    let resolved = engine
        .value_share_resolved(&inputs, ValuationParams::default())
        .await
        .unwrap();
    assert_eq!(resolved, by_registry);
    assert_eq!(pool_state.liquidity_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_position_keyed_by_separate_owner() {
    let manager = Address::repeat_byte(0x77);
    let pool_state = Arc::new(
        MockPool::new(token18(), token6())
            .with_position(position_key(manager, -1000, 1000), 3_000_000_000_000_000),
    );
    let shares = Arc::new(
        MockShares::new(U256::from(3u64) * U256::exp10(18), (-1000, 1000)).with_owner(manager),
    );
    let engine = share_engine(&pool_state, &shares);

    let valuation = engine
        .value_share_with_feeds(
            share_token(),
            Some(feed_a()),
            Some(feed_b()),
            ValuationParams::default(),
        )
        .await
        .unwrap();
    assert_eq!(valuation.value_usd, U256::from(200_073_331_916_090_000u64));
}

#[tokio::test]
async fn test_share_without_provider_fails() {
    let pool_state = Arc::new(wrapped_pool(1));
    let engine = engine(&pool_state, feeds());

    let err = engine
        .value_share(share_token(), ValuationParams::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ValuationError::MissingProvider(_)));
}
