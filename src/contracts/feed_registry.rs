use ethers::prelude::abigen;

// Chainlink FeedRegistry; getFeed reverts with "Feed not found" for unknown pairs
abigen!(
    FeedRegistry,
    r#"[
        function getFeed(address base, address quote) external view returns (address aggregator)
    ]"#,
);
