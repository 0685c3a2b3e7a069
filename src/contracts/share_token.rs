use ethers::prelude::abigen;

// ERC20 wrapper owning a single Uniswap V3 position
abigen!(
    PositionShareToken,
    r#"[
        function totalSupply() external view returns (uint256)
        function pool() external view returns (address)
        function tickLower() external view returns (int24)
        function tickUpper() external view returns (int24)
    ]"#,
);
