// src/twap.rs

//! TWAP fallback: derives the USD price of a token without a feed from the
//! pool's mean tick and the other token's feed price.

use log::debug;

use crate::error::ValuationError;
use crate::tokens::DecimalBase;
use crate::types::{PriceSource, TokenPrice};
use crate::v3_math::{get_quote_at_tick, mul_div, MathError};

/// Mean tick from two tick cumulatives `window_secs` apart, rounded toward
/// negative infinity.
pub fn arithmetic_mean_tick(
    tick_cumulative_start: i64,
    tick_cumulative_end: i64,
    window_secs: u32,
) -> Result<i32, MathError> {
    if window_secs == 0 {
        return Err(MathError::DivisionByZero);
    }
    let delta = tick_cumulative_end
        .checked_sub(tick_cumulative_start)
        .ok_or(MathError::Overflow)?;
    let window = i64::from(window_secs);

    let mut tick = delta / window;
    if delta < 0 && delta % window != 0 {
        tick -= 1;
    }
    i32::try_from(tick).map_err(|_| MathError::Overflow)
}

/// USD price of the token without a feed.
///
/// One whole unit of that token (`unknown_base`) is quoted at `mean_tick` in
/// raw units of the known token, then valued at the known price:
/// `price = quote * known.value / known_base`.
pub fn derive_price(
    known: &TokenPrice,
    known_base: DecimalBase,
    unknown_base: DecimalBase,
    unknown_is_token0: bool,
    mean_tick: i32,
    window_secs: u32,
) -> Result<TokenPrice, ValuationError> {
    let quote = get_quote_at_tick(mean_tick, unknown_base.value(), unknown_is_token0)?;
    let value = mul_div(quote, known.value, known_base.value())?;
    debug!(
        "TWAP tick {} over {}s: quote {} -> derived price {}",
        mean_tick, window_secs, quote, value
    );
    Ok(TokenPrice {
        value,
        source: PriceSource::Twap {
            window_secs,
            mean_tick,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::{Address, U256};

    fn usdc_price() -> TokenPrice {
        TokenPrice {
            value: U256::from(100_000_000u64),
            source: PriceSource::Feed {
                feed: Address::repeat_byte(0xaa),
                updated_at: 0,
            },
        }
    }

    #[test]
    fn test_mean_tick_rounds_toward_negative_infinity() {
        assert_eq!(arithmetic_mean_tick(0, 1800 * 42, 1800).unwrap(), 42);
        assert_eq!(arithmetic_mean_tick(0, 1801, 1800).unwrap(), 1);
        assert_eq!(arithmetic_mean_tick(0, -1800, 1800).unwrap(), -1);
        assert_eq!(arithmetic_mean_tick(0, -1801, 1800).unwrap(), -2);
        assert_eq!(arithmetic_mean_tick(1000, 1000 - 200311 * 60, 60).unwrap(), -200311);
    }

    #[test]
    fn test_mean_tick_rejects_zero_window() {
        assert_eq!(arithmetic_mean_tick(0, 10, 0), Err(MathError::DivisionByZero));
        assert_eq!(arithmetic_mean_tick(i64::MIN, i64::MAX, 1), Err(MathError::Overflow));
    }

    #[test]
    fn test_derive_token0_price_from_token1_feed() {
        // ETH/USDC-style pool: token0 18 decimals, token1 6 decimals
        let derived = derive_price(
            &usdc_price(),
            DecimalBase::from_decimals(6).unwrap(),
            DecimalBase::from_decimals(18).unwrap(),
            true,
            -200311,
            1800,
        )
        .unwrap();
        assert_eq!(derived.value, U256::from(200_004_028_900u64));
        assert!(derived.is_derived());
        assert_eq!(
            derived.source,
            PriceSource::Twap { window_secs: 1800, mean_tick: -200311 }
        );
    }

    #[test]
    fn test_derive_token1_price_from_token0_feed() {
        let derived = derive_price(
            &usdc_price(),
            DecimalBase::from_decimals(6).unwrap(),
            DecimalBase::from_decimals(18).unwrap(),
            false,
            200311,
            1800,
        )
        .unwrap();
        assert_eq!(derived.value, U256::from(200_004_028_900u64));
    }
}
