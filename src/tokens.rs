//! # Token Normalizer
//!
//! Maps a token to the denomination a feed registry is keyed by (WETH is
//! priced as ETH, WBTC as BTC) and to its fixed-point decimal base.
//!
//! The mapping is injected configuration, not compiled-in globals: a
//! [`TokenRegistry`] is built once per deployment (usually from
//! [`crate::settings::Settings::token_registry`]) and handed to the engine.
//! Tokens with a configured base never cost an RPC call; everything else falls
//! back to the token's own `decimals()`.

use ethers::types::{Address, H160, U256};
use log::debug;
use std::collections::HashMap;

use crate::error::ValuationError;
use crate::providers::DecimalsProvider;
use crate::v3_math::MathError;

/// Fixed-point scale of a token: `10^decimals`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecimalBase(U256);

impl DecimalBase {
    pub fn from_decimals(decimals: u8) -> Result<Self, MathError> {
        U256::from(10u8)
            .checked_pow(U256::from(decimals))
            .map(Self)
            .ok_or(MathError::Overflow)
    }

    pub fn value(self) -> U256 {
        self.0
    }
}

impl From<U256> for DecimalBase {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

/// Chainlink feed registry denominations (`Denominations.sol`).
pub struct Denominations;

impl Denominations {
    /// 0x0000000000000000000000000000000000000348 (ISO 4217 code 840)
    pub const USD: Address = H160([
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x03, 0x48,
    ]);
    /// 0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE
    pub const ETH: Address = H160([0xee; 20]);
    /// 0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB
    pub const BTC: Address = H160([0xbb; 20]);
}

/// Ethereum mainnet token addresses used by [`TokenRegistry::mainnet_defaults`].
pub mod mainnet {
    use ethers::types::{Address, H160};

    /// 0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2
    pub const WETH: Address = H160([
        0xc0, 0x2a, 0xaa, 0x39, 0xb2, 0x23, 0xfe, 0x8d, 0x0a, 0x0e, 0x5c, 0x4f, 0x27, 0xea, 0xd9,
        0x08, 0x3c, 0x75, 0x6c, 0xc2,
    ]);
    /// 0x2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599
    pub const WBTC: Address = H160([
        0x22, 0x60, 0xfa, 0xc5, 0xe5, 0x54, 0x2a, 0x77, 0x3a, 0xa4, 0x4f, 0xbc, 0xfe, 0xdf, 0x7c,
        0x19, 0x3b, 0xc2, 0xc5, 0x99,
    ]);
    /// 0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48
    pub const USDC: Address = H160([
        0xa0, 0xb8, 0x69, 0x91, 0xc6, 0x21, 0x8b, 0x36, 0xc1, 0xd1, 0x9d, 0x4a, 0x2e, 0x9e, 0xb0,
        0xce, 0x36, 0x06, 0xeb, 0x48,
    ]);
    /// 0xdAC17F958D2ee523a2206206994597C13D831ec7
    pub const USDT: Address = H160([
        0xda, 0xc1, 0x7f, 0x95, 0x8d, 0x2e, 0xe5, 0x23, 0xa2, 0x20, 0x62, 0x06, 0x99, 0x45, 0x97,
        0xc1, 0x3d, 0x83, 0x1e, 0xc7,
    ]);
    /// 0x6B175474E89094C44Da98b954EedeAC495271d0F
    pub const DAI: Address = H160([
        0x6b, 0x17, 0x54, 0x74, 0xe8, 0x90, 0x94, 0xc4, 0x4d, 0xa9, 0x8b, 0x95, 0x4e, 0xed, 0xea,
        0xc4, 0x95, 0x27, 0x1d, 0x0f,
    ]);
}

/// Per-deployment token configuration: decimal bases and feed denominations.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    bases: HashMap<Address, DecimalBase>,
    denominations: HashMap<Address, Address>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// WETH/WBTC denominations and the bases of the most common mainnet tokens.
    pub fn mainnet_defaults() -> Self {
        Self::new()
            .with_base(mainnet::WETH, DecimalBase(U256::exp10(18)))
            .with_base(mainnet::WBTC, DecimalBase(U256::exp10(8)))
            .with_base(mainnet::USDC, DecimalBase(U256::exp10(6)))
            .with_base(mainnet::USDT, DecimalBase(U256::exp10(6)))
            .with_base(mainnet::DAI, DecimalBase(U256::exp10(18)))
            .with_denomination(mainnet::WETH, Denominations::ETH)
            .with_denomination(mainnet::WBTC, Denominations::BTC)
    }

    pub fn with_base(mut self, token: Address, base: DecimalBase) -> Self {
        self.bases.insert(token, base);
        self
    }

    pub fn with_decimals(self, token: Address, decimals: u8) -> Result<Self, MathError> {
        Ok(self.with_base(token, DecimalBase::from_decimals(decimals)?))
    }

    pub fn with_denomination(mut self, token: Address, denomination: Address) -> Self {
        self.denominations.insert(token, denomination);
        self
    }

    /// Identity the feed registry is keyed by; the token itself unless remapped.
    pub fn denomination(&self, token: Address) -> Address {
        self.denominations.get(&token).copied().unwrap_or(token)
    }

    pub fn known_base(&self, token: Address) -> Option<DecimalBase> {
        self.bases.get(&token).copied()
    }

    /// Configured base, or `10^decimals()` read from the token.
    pub async fn resolve_base(
        &self,
        token: Address,
        decimals: &dyn DecimalsProvider,
    ) -> Result<DecimalBase, ValuationError> {
        if let Some(base) = self.known_base(token) {
            return Ok(base);
        }
        let token_decimals = decimals.decimals(token).await?;
        debug!("Token {:?} has {} decimals (read from chain)", token, token_decimals);
        Ok(DecimalBase::from_decimals(token_decimals)?)
    }
}
