use ethers::types::Address;

use crate::error::ValuationError;
use crate::feeds::{FeedAvailability, ResolvedFeeds};
use crate::tokens::DecimalBase;
use crate::v3_math::{MAX_TICK, MIN_TICK};

/// A concentrated-liquidity position: a tick range and the liquidity in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub pool: Address,
    pub token0: Address,
    pub token1: Address,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub liquidity: u128,
}

impl Position {
    pub fn new(
        pool: Address,
        token0: Address,
        token1: Address,
        tick_lower: i32,
        tick_upper: i32,
        liquidity: u128,
    ) -> Result<Self, ValuationError> {
        validate_tick_range(tick_lower, tick_upper)?;
        Ok(Self {
            pool,
            token0,
            token1,
            tick_lower,
            tick_upper,
            liquidity,
        })
    }
}

/// `tick_lower < tick_upper`, both inside the protocol's tick bounds.
pub fn validate_tick_range(tick_lower: i32, tick_upper: i32) -> Result<(), ValuationError> {
    if tick_lower >= tick_upper || tick_lower < MIN_TICK || tick_upper > MAX_TICK {
        return Err(ValuationError::InvalidTickRange {
            lower: tick_lower,
            upper: tick_upper,
        });
    }
    Ok(())
}

/// Fully resolved input of the core valuation: nothing left to discover.
///
/// Built by the discovery entry points, or supplied directly by callers that
/// already know token order, decimal bases and feed handles. Nothing in here
/// is checked against the chain; wrong bases or swapped tokens give a wrong
/// (but well-defined) number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionInputs {
    pub position: Position,
    pub base0: DecimalBase,
    pub base1: DecimalBase,
    pub feeds: ResolvedFeeds,
}

impl PositionInputs {
    /// Inputs with caller-supplied feed handles (no registry involved).
    pub fn new(
        position: Position,
        base0: DecimalBase,
        base1: DecimalBase,
        feed0: Option<Address>,
        feed1: Option<Address>,
    ) -> Self {
        Self {
            position,
            base0,
            base1,
            feeds: ResolvedFeeds {
                token0: FeedAvailability::from_handle(feed0),
                token1: FeedAvailability::from_handle(feed1),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_range_validation() {
        assert!(validate_tick_range(-10, 10).is_ok());
        assert!(validate_tick_range(MIN_TICK, MAX_TICK).is_ok());
        assert!(matches!(
            validate_tick_range(10, 10),
            Err(ValuationError::InvalidTickRange { lower: 10, upper: 10 })
        ));
        assert!(validate_tick_range(10, -10).is_err());
        assert!(validate_tick_range(MIN_TICK - 1, 0).is_err());
        assert!(validate_tick_range(0, MAX_TICK + 1).is_err());
    }

    #[test]
    fn test_position_new_validates() {
        let pool = Address::repeat_byte(1);
        let position = Position::new(pool, Address::zero(), Address::zero(), -60, 60, 0).unwrap();
        assert_eq!(position.liquidity, 0);
        assert!(Position::new(pool, Address::zero(), Address::zero(), 60, -60, 1).is_err());
    }
}
