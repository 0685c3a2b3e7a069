// Contracts Module - read-only ABIs consumed by the on-chain providers

pub mod aggregator_v3_interface;
pub mod erc20;
pub mod feed_registry;
pub mod share_token;
pub mod uniswap_v3;

pub use aggregator_v3_interface::AggregatorV3Interface;
pub use erc20::Erc20;
pub use feed_registry::FeedRegistry;
pub use share_token::PositionShareToken;
pub use uniswap_v3::UniswapV3Pool;
