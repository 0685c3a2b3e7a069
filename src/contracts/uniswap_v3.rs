use ethers::prelude::abigen;

// ═══════════════════════════════════════════════════════════════════════════
// UNISWAP V3 POOL ABI - read-only subset used for valuation
// ═══════════════════════════════════════════════════════════════════════════
//
// Solidity types are kept exact:
// - int56 tickCumulatives decode as i64
// - uint128 liquidity decodes as u128
// - bytes32 position keys are passed as [u8; 32]
// ═══════════════════════════════════════════════════════════════════════════

abigen!(
    UniswapV3Pool,
    r#"[
        function token0() external view returns (address)
        function token1() external view returns (address)
        function observe(uint32[] calldata secondsAgos) external view returns (int56[] tickCumulatives, uint160[] secondsPerLiquidityCumulativeX128s)
        function positions(bytes32 key) external view returns (uint128 liquidity, uint256 feeGrowthInside0LastX128, uint256 feeGrowthInside1LastX128, uint128 tokensOwed0, uint128 tokensOwed1)
    ]"#
);
