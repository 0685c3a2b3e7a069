// Uniswap V3 fixed-point math for position valuation (integer-only, floor rounding)
use ethers::types::{Address, H256, U256, U512};
use ethers::utils::keccak256;

/// Uniswap V3 constants
pub const MIN_TICK: i32 = -887272;
pub const MAX_TICK: i32 = 887272;
pub const MIN_SQRT_RATIO: U256 = U256([4295128739, 0, 0, 0]); // sqrt(1.0001^-887272) * 2^96
pub const MAX_SQRT_RATIO: U256 = U256([
    0x5d951d5263988d26,
    0xefd1fc6a50648849,
    0xfffd8963,
    0,
]); // sqrt(1.0001^887272) * 2^96

/// Q96 fixed point constant (2^96)
pub const Q96: U256 = U256([0, 4294967296, 0, 0]);

/// 1/sqrt(1.0001)^(2^i) in Q128.128, i = 0..19 (TickMath.sol)
const TICK_RATIOS: [u128; 20] = [
    0xfffcb933bd6fad37aa2d162d1a594001,
    0xfff97272373d413259a46990580e213a,
    0xfff2e50f5f656932ef12357cf3c7fdcc,
    0xffe5caca7e10e4e61c3624eaa0941cd0,
    0xffcb9843d60f6159c9db58835c926644,
    0xff973b41fa98c081472e6896dfb254c0,
    0xff2ea16466c96a3843ec78b326b52861,
    0xfe5dee046a99a2a811c461f1969c3053,
    0xfcbe86c7900a88aedcffc83b479aa3a4,
    0xf987a7253ac413176f2b074cf7815e54,
    0xf3392b0822b70005940c7a398e4b70f3,
    0xe7159475a2c29b7443b29c7fa6e889d9,
    0xd097f3bdfd2022b8845ad8f792aa5825,
    0xa9f746462d870fdf8a65dc1f90e061e5,
    0x70d869a156d2a1b890bb3df62baf32f7,
    0x31be135f97d08fd981231505542fcfa6,
    0x9aa508b5b7a84e1c677de54f3e99bc9,
    0x5d6af8dedb81196699c329225ee604,
    0x2216e584f5fa1ea926041bedfe98,
    0x48a170391f7dc42444e8fa2,
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MathError {
    #[error("tick {0} outside [-887272, 887272]")]
    TickOutOfBounds(i32),
    #[error("fixed-point overflow")]
    Overflow,
    #[error("division by zero")]
    DivisionByZero,
}

/// Calculate sqrt price from tick (TickMath.getSqrtRatioAtTick, bit-exact)
pub fn get_sqrt_ratio_at_tick(tick: i32) -> Result<U256, MathError> {
    if !(MIN_TICK..=MAX_TICK).contains(&tick) {
        return Err(MathError::TickOutOfBounds(tick));
    }

    let abs_tick = tick.unsigned_abs();
    let mut ratio = if abs_tick & 0x1 != 0 {
        U256::from(TICK_RATIOS[0])
    } else {
        U256::one() << 128
    };

    // ratio <= 2^128 and every multiplier < 2^128, so the product fits in 256 bits
    for (bit, multiplier) in TICK_RATIOS.iter().enumerate().skip(1) {
        if abs_tick & (1u32 << bit) != 0 {
            ratio = (ratio * U256::from(*multiplier)) >> 128;
        }
    }

    if tick > 0 {
        ratio = U256::MAX / ratio;
    }

    // Q128.128 -> Q64.96, rounding up
    let remainder = ratio & U256::from(u32::MAX);
    let sqrt_price_x96 = ratio >> 32;
    if remainder.is_zero() {
        Ok(sqrt_price_x96)
    } else {
        Ok(sqrt_price_x96 + U256::one())
    }
}

/// floor(a * b / denominator) with a 512-bit intermediate product
#[inline]
pub fn mul_div(a: U256, b: U256, denominator: U256) -> Result<U256, MathError> {
    if denominator.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    let quotient = a.full_mul(b) / U512::from(denominator);
    U256::try_from(quotient).map_err(|_| MathError::Overflow)
}

fn sorted(sqrt_ratio_a_x96: U256, sqrt_ratio_b_x96: U256) -> (U256, U256) {
    if sqrt_ratio_a_x96 > sqrt_ratio_b_x96 {
        (sqrt_ratio_b_x96, sqrt_ratio_a_x96)
    } else {
        (sqrt_ratio_a_x96, sqrt_ratio_b_x96)
    }
}

/// Amount of token0 held between two sqrt prices (LiquidityAmounts.getAmount0ForLiquidity)
pub fn get_amount0_for_liquidity(
    sqrt_ratio_a_x96: U256,
    sqrt_ratio_b_x96: U256,
    liquidity: u128,
) -> Result<U256, MathError> {
    let (lower, upper) = sorted(sqrt_ratio_a_x96, sqrt_ratio_b_x96);
    if lower.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    let intermediate = mul_div(U256::from(liquidity) << 96, upper - lower, upper)?;
    Ok(intermediate / lower)
}

/// Amount of token1 held between two sqrt prices (LiquidityAmounts.getAmount1ForLiquidity)
pub fn get_amount1_for_liquidity(
    sqrt_ratio_a_x96: U256,
    sqrt_ratio_b_x96: U256,
    liquidity: u128,
) -> Result<U256, MathError> {
    let (lower, upper) = sorted(sqrt_ratio_a_x96, sqrt_ratio_b_x96);
    mul_div(U256::from(liquidity), upper - lower, Q96)
}

/// Token amounts held by `liquidity` over [a, b] at the current sqrt price.
///
/// The current price is clamped into the range: below it the position is all
/// token0, above it all token1.
pub fn get_amounts_for_liquidity(
    sqrt_ratio_x96: U256,
    sqrt_ratio_a_x96: U256,
    sqrt_ratio_b_x96: U256,
    liquidity: u128,
) -> Result<(U256, U256), MathError> {
    let (lower, upper) = sorted(sqrt_ratio_a_x96, sqrt_ratio_b_x96);

    if sqrt_ratio_x96 <= lower {
        Ok((get_amount0_for_liquidity(lower, upper, liquidity)?, U256::zero()))
    } else if sqrt_ratio_x96 < upper {
        Ok((
            get_amount0_for_liquidity(sqrt_ratio_x96, upper, liquidity)?,
            get_amount1_for_liquidity(lower, sqrt_ratio_x96, liquidity)?,
        ))
    } else {
        Ok((U256::zero(), get_amount1_for_liquidity(lower, upper, liquidity)?))
    }
}

/// Pool sqrt price implied by two USD prices, in Q64.96.
///
/// The raw-unit ratio `price0 * base1 / (price1 * base0)` is shifted left by 96
/// bits before the division, square-rooted (giving a Q48 value) and then shifted
/// left by the remaining 48 bits. Doing the full 192-bit shift before the square
/// root instead loses the low bits of the ratio; callers depend on this exact
/// sequence for reproducible results.
pub fn sqrt_price_x96_from_usd_prices(
    price0: U256,
    price1: U256,
    base0: U256,
    base1: U256,
) -> Result<U256, MathError> {
    let numerator = price0.full_mul(base1);
    if numerator.bits() > 512 - 96 {
        return Err(MathError::Overflow);
    }
    let denominator = price1.full_mul(base0);
    if denominator.is_zero() {
        return Err(MathError::DivisionByZero);
    }

    let ratio_x96 = (numerator << 96) / denominator;
    let sqrt_ratio_x48 = ratio_x96.integer_sqrt();
    U256::try_from(sqrt_ratio_x48 << 48).map_err(|_| MathError::Overflow)
}

/// Amount of the quote token received for `base_amount` of the base token at
/// `tick` (OracleLibrary.getQuoteAtTick).
pub fn get_quote_at_tick(
    tick: i32,
    base_amount: U256,
    base_is_token0: bool,
) -> Result<U256, MathError> {
    let sqrt_ratio_x96 = get_sqrt_ratio_at_tick(tick)?;

    if sqrt_ratio_x96 <= U256::from(u128::MAX) {
        let ratio_x192 = sqrt_ratio_x96 * sqrt_ratio_x96;
        if base_is_token0 {
            mul_div(ratio_x192, base_amount, U256::one() << 192)
        } else {
            mul_div(U256::one() << 192, base_amount, ratio_x192)
        }
    } else {
        let ratio_x128 = mul_div(sqrt_ratio_x96, sqrt_ratio_x96, U256::one() << 64)?;
        if base_is_token0 {
            mul_div(ratio_x128, base_amount, U256::one() << 128)
        } else {
            mul_div(U256::one() << 128, base_amount, ratio_x128)
        }
    }
}

/// Key of a position in the pool's `positions` mapping:
/// keccak256(abi.encodePacked(owner, int24 tickLower, int24 tickUpper))
pub fn position_key(owner: Address, tick_lower: i32, tick_upper: i32) -> H256 {
    let mut packed = Vec::with_capacity(26);
    packed.extend_from_slice(owner.as_bytes());
    packed.extend_from_slice(&tick_lower.to_be_bytes()[1..]);
    packed.extend_from_slice(&tick_upper.to_be_bytes()[1..]);
    H256::from(keccak256(packed))
}
