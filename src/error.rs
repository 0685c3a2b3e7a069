use ethers::types::Address;

use crate::v3_math::MathError;

/// Every way a valuation call can fail.
///
/// All variants are fatal to the current call; nothing here is retried
/// internally and no partial value is ever returned alongside an error.
/// Provider failures (insufficient TWAP history, missing `decimals()`, RPC
/// errors) are carried unchanged in [`ValuationError::Provider`].
#[derive(Debug, thiserror::Error)]
pub enum ValuationError {
    /// The sequencer uptime feed reports downtime.
    #[error("sequencer is down")]
    SequencerDown,
    /// The sequencer came back up less than the grace period ago.
    #[error("sequencer grace period not over ({elapsed}s since recovery, grace period {grace_period}s)")]
    GracePeriodNotOver { elapsed: u64, grace_period: u64 },
    /// A resolved feed was last updated longer ago than the caller tolerates.
    #[error("chainlink price from {feed:?} is too old ({age}s, max {max_age}s)")]
    ChainlinkPriceTooOld { feed: Address, age: u64, max_age: u64 },
    /// No usable feed price, so the position has no USD anchor.
    #[error("no chainlink price available")]
    NoChainlinkPriceAvailable,
    #[error("invalid tick range [{lower}, {upper}]")]
    InvalidTickRange { lower: i32, upper: i32 },
    #[error("no {0} provider configured")]
    MissingProvider(&'static str),
    #[error(transparent)]
    Math(#[from] MathError),
    #[error(transparent)]
    Provider(#[from] anyhow::Error),
}

impl ValuationError {
    /// Short stable label, used as a metrics label and in CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SequencerDown => "sequencer_down",
            Self::GracePeriodNotOver { .. } => "grace_period_not_over",
            Self::ChainlinkPriceTooOld { .. } => "price_too_old",
            Self::NoChainlinkPriceAvailable => "no_price_available",
            Self::InvalidTickRange { .. } => "invalid_tick_range",
            Self::MissingProvider(_) => "missing_provider",
            Self::Math(_) => "math",
            Self::Provider(_) => "provider",
        }
    }
}
