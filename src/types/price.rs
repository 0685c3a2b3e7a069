use ethers::types::{Address, U256};
use rust_decimal::Decimal;

use crate::types::conversions::{u256_to_decimal, ConversionError};

/// Decimals of every USD price handled by the engine (Chainlink USD feeds)
pub const PRICE_DECIMALS: u8 = 8;
/// Decimals of the final USD valuation
pub const USD_DECIMALS: u8 = 18;

/// Where a token's USD price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceSource {
    /// Read from a push feed; `updated_at` is the feed's own timestamp.
    Feed { feed: Address, updated_at: u64 },
    /// Cross-rate from the pool TWAP and the other token's feed price.
    Twap { window_secs: u32, mean_tick: i32 },
}

/// USD price of one whole token, 8 decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPrice {
    pub value: U256,
    pub source: PriceSource,
}

impl TokenPrice {
    pub fn is_derived(&self) -> bool {
        matches!(self.source, PriceSource::Twap { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricePair {
    pub token0: TokenPrice,
    pub token1: TokenPrice,
}

/// Result of a valuation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Valuation {
    /// USD value, 18 decimals, rounded down
    pub value_usd: U256,
    /// Prices used; `None` when the value was short-circuited to zero
    pub prices: Option<PricePair>,
}

impl Valuation {
    pub fn zero() -> Self {
        Self {
            value_usd: U256::zero(),
            prices: None,
        }
    }

    /// Human-readable USD amount (lossless while it fits a `Decimal`)
    pub fn value_usd_decimal(&self) -> Result<Decimal, ConversionError> {
        u256_to_decimal(self.value_usd, USD_DECIMALS)
    }
}
