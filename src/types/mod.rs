//! Value types shared by every stage of a valuation call.
//!
//! Nothing here is persisted or cached: each type is created fresh per call
//! and dropped once the final [`Valuation`] is produced.

pub mod conversions;
pub mod position;
pub mod price;

pub use position::{validate_tick_range, Position, PositionInputs};
pub use price::{PricePair, PriceSource, TokenPrice, Valuation, PRICE_DECIMALS, USD_DECIMALS};
