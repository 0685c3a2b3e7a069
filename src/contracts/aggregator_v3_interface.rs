use ethers::prelude::abigen;

// Chainlink price feeds and sequencer uptime feeds share this interface.
// For uptime feeds `answer` is 0 (up) or 1 (down) and `startedAt` is the
// timestamp of the last status change.
abigen!(
    AggregatorV3Interface,
    r#"[
        function latestRoundData() external view returns (uint80 roundId, int256 answer, uint256 startedAt, uint256 updatedAt, uint80 answeredInRound)
        function decimals() external view returns (uint8)
    ]"#,
);
