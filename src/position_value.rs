// src/position_value.rs

//! Liquidity-to-amount converter: USD value of a tick range and liquidity at
//! given token prices.
//!
//! All divisions floor, so a position is never valued above what its
//! amounts are worth at the supplied prices.

use ethers::types::U256;

use crate::tokens::DecimalBase;
use crate::types::{PRICE_DECIMALS, USD_DECIMALS};
use crate::v3_math::{
    get_amounts_for_liquidity, get_sqrt_ratio_at_tick, mul_div, sqrt_price_x96_from_usd_prices,
    MathError,
};

/// Intermediate and final figures of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionAmounts {
    /// Pool price implied by the USD prices, Q64.96
    pub sqrt_price_x96: U256,
    pub amount0: U256,
    pub amount1: U256,
    /// 18 decimals
    pub value_usd: U256,
}

/// Raw token amount to USD: `amount * price * 10^(18 - 8) / base`.
pub fn amount_to_usd(amount: U256, price: U256, base: DecimalBase) -> Result<U256, MathError> {
    let scale = U256::exp10(usize::from(USD_DECIMALS - PRICE_DECIMALS));
    let price_e18 = price.checked_mul(scale).ok_or(MathError::Overflow)?;
    mul_div(amount, price_e18, base.value())
}

pub fn position_amounts(
    price0: U256,
    price1: U256,
    base0: DecimalBase,
    base1: DecimalBase,
    tick_lower: i32,
    tick_upper: i32,
    liquidity: u128,
) -> Result<PositionAmounts, MathError> {
    let sqrt_price_x96 =
        sqrt_price_x96_from_usd_prices(price0, price1, base0.value(), base1.value())?;
    let sqrt_lower = get_sqrt_ratio_at_tick(tick_lower)?;
    let sqrt_upper = get_sqrt_ratio_at_tick(tick_upper)?;
    let (amount0, amount1) =
        get_amounts_for_liquidity(sqrt_price_x96, sqrt_lower, sqrt_upper, liquidity)?;

    let value_usd = amount_to_usd(amount0, price0, base0)?
        .checked_add(amount_to_usd(amount1, price1, base1)?)
        .ok_or(MathError::Overflow)?;

    Ok(PositionAmounts {
        sqrt_price_x96,
        amount0,
        amount1,
        value_usd,
    })
}

pub fn position_value_usd(
    price0: U256,
    price1: U256,
    base0: DecimalBase,
    base1: DecimalBase,
    tick_lower: i32,
    tick_upper: i32,
    liquidity: u128,
) -> Result<U256, MathError> {
    position_amounts(price0, price1, base0, base1, tick_lower, tick_upper, liquidity)
        .map(|amounts| amounts.value_usd)
}
