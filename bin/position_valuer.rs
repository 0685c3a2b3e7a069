//! # Position Valuer
//!
//! Values a Uniswap V3 position or a position-share token in USD using the
//! settings from `Config.toml` (or `--config`).
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin position_valuer -- position \
//!     --pool 0x88e6A0c2dDD26FEEb64F039a2c41296FcB3f5640 \
//!     --tick-lower=-200000 --tick-upper=-190000 --liquidity 1000000000000000
//!
//! cargo run --bin position_valuer -- --json share --token 0x...
//! ```
//!
//! Exits with status 1 on configuration or RPC setup errors and 2 when the
//! valuation itself fails.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use ethers::prelude::{Address, Http, Provider};
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use lp_valuation_sdk::providers::onchain::{
    BlockTimestampClock, ChainlinkFeedRegistry, ChainlinkFeeds, Erc20Decimals, OnchainPoolState,
    OnchainShareToken, SequencerUptimeFeed,
};
use lp_valuation_sdk::providers::{PoolStateProvider, ShareTokenProvider};
use lp_valuation_sdk::types::conversions::u256_to_decimal;
use lp_valuation_sdk::types::{PriceSource, TokenPrice, PRICE_DECIMALS};
use lp_valuation_sdk::{Settings, Valuation, ValuationEngine, ValuationError, ValuationParams};

#[derive(Parser)]
#[command(name = "position_valuer")]
#[command(about = "Flashloan-resistant USD valuation of Uniswap V3 positions", long_about = None)]
#[command(version)]
struct Cli {
    /// Settings file
    #[arg(long, default_value = "Config.toml")]
    config: PathBuf,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Override oracle.max_feed_age_seconds
    #[arg(long)]
    max_feed_age: Option<u64>,

    /// Override oracle.twap_window_seconds
    #[arg(long)]
    twap_window: Option<u32>,

    /// Serve Prometheus metrics on this address
    #[cfg(feature = "observability")]
    #[arg(long)]
    metrics_addr: Option<std::net::SocketAddr>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Value a position given by pool, tick range and liquidity
    Position {
        #[arg(long)]
        pool: Address,
        #[arg(long, allow_hyphen_values = true)]
        tick_lower: i32,
        #[arg(long, allow_hyphen_values = true)]
        tick_upper: i32,
        #[arg(long)]
        liquidity: u128,
        #[command(flatten)]
        feeds: FeedArgs,
    },
    /// Value one whole share of a position-share token
    Share {
        #[arg(long)]
        token: Address,
        /// Pool position owner when it is not the share token itself
        #[arg(long)]
        owner: Option<Address>,
        #[command(flatten)]
        feeds: FeedArgs,
    },
}

/// Feed selection; without any of these the registry (or `[feeds]`) is used.
#[derive(Args)]
struct FeedArgs {
    /// Direct feed for token0
    #[arg(long)]
    feed0: Option<Address>,
    /// Direct feed for token1
    #[arg(long)]
    feed1: Option<Address>,
    /// Registry lookup flag for token0 (false skips the lookup)
    #[arg(long)]
    has_feed0: Option<bool>,
    /// Registry lookup flag for token1 (false skips the lookup)
    #[arg(long)]
    has_feed1: Option<bool>,
}

#[derive(Serialize)]
struct PriceReport {
    usd: Decimal,
    source: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    feed: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mean_tick: Option<i32>,
}

#[derive(Serialize)]
struct Report {
    value_usd_raw: String,
    value_usd: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    token0: Option<PriceReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    token1: Option<PriceReport>,
}

impl PriceReport {
    fn from_price(price: &TokenPrice) -> Result<Self> {
        let (source, feed, mean_tick) = match price.source {
            PriceSource::Feed { feed, .. } => ("feed", Some(feed), None),
            PriceSource::Twap { mean_tick, .. } => ("twap", None, Some(mean_tick)),
        };
        Ok(Self {
            usd: u256_to_decimal(price.value, PRICE_DECIMALS)?,
            source,
            feed,
            mean_tick,
        })
    }
}

impl Report {
    fn from_valuation(valuation: &Valuation) -> Result<Self> {
        let (token0, token1) = match &valuation.prices {
            Some(pair) => (
                Some(PriceReport::from_price(&pair.token0)?),
                Some(PriceReport::from_price(&pair.token1)?),
            ),
            None => (None, None),
        };
        Ok(Self {
            value_usd_raw: valuation.value_usd.to_string(),
            value_usd: valuation.value_usd_decimal()?,
            token0,
            token1,
        })
    }
}

struct Runtime {
    engine: ValuationEngine,
    pools: Arc<OnchainPoolState<Provider<Http>>>,
    shares: Arc<OnchainShareToken<Provider<Http>>>,
    settings: Settings,
    has_registry: bool,
    params: ValuationParams,
}

fn build(settings: Settings, cli: &Cli) -> Result<Runtime> {
    let provider = Arc::new(
        Provider::<Http>::try_from(settings.rpc.http_url.as_str())
            .with_context(|| format!("invalid rpc.http_url {:?}", settings.rpc.http_url))?,
    );

    let pools = Arc::new(OnchainPoolState::new(provider.clone()));
    let mut shares = OnchainShareToken::new(provider.clone());
    if let Commands::Share {
        token,
        owner: Some(owner),
        ..
    } = &cli.command
    {
        shares = shares.with_position_owner(*token, *owner);
    }
    let shares = Arc::new(shares);
    let feeds = ChainlinkFeeds::new(provider.clone())
        .with_decimals_normalization(settings.oracle.feed_decimals_normalization);

    let mut engine = ValuationEngine::new(
        pools.clone(),
        Arc::new(feeds),
        Arc::new(Erc20Decimals::new(provider.clone())),
        Arc::new(BlockTimestampClock::new(provider.clone())),
        settings.token_registry()?,
    )
    .with_grace_period(settings.oracle.grace_period_seconds)
    .with_share_tokens(shares.clone());

    let registry = settings.feed_registry()?;
    if let Some(registry) = registry {
        log::info!("🔗 Using feed registry {:?}", registry);
        engine = engine.with_feed_registry(Arc::new(ChainlinkFeedRegistry::new(
            provider.clone(),
            registry,
        )));
    }
    if let Some(uptime_feed) = settings.sequencer_uptime_feed()? {
        log::info!("🔗 Using sequencer uptime feed {:?}", uptime_feed);
        engine = engine.with_liveness(Arc::new(SequencerUptimeFeed::new(
            provider.clone(),
            uptime_feed,
        )));
    }

    let mut params = settings.valuation_params();
    if let Some(max_age) = cli.max_feed_age {
        params.max_feed_age_secs = max_age;
    }
    if let Some(window) = cli.twap_window {
        params.twap_window_secs = window;
    }

    Ok(Runtime {
        engine,
        pools,
        shares,
        settings,
        has_registry: registry.is_some(),
        params,
    })
}

/// Feed handles from `[feeds]` for the pool's two tokens.
async fn configured_handles(
    ctx: &Runtime,
    pool: Address,
) -> Result<(Option<Address>, Option<Address>)> {
    let handles = ctx.settings.feed_handles()?;
    let (token0, token1) = ctx.pools.tokens(pool).await?;
    Ok((handles.get(&token0).copied(), handles.get(&token1).copied()))
}

/// Outer error: setup reads done here; inner: the valuation itself.
async fn run(
    ctx: &Runtime,
    command: &Commands,
) -> Result<std::result::Result<Valuation, ValuationError>> {
    let engine = &ctx.engine;
    let params = ctx.params;

    let valuation = match command {
        Commands::Position {
            pool,
            tick_lower,
            tick_upper,
            liquidity,
            feeds,
        } => {
            let (pool, lower, upper, liquidity) = (*pool, *tick_lower, *tick_upper, *liquidity);
            if feeds.feed0.is_some() || feeds.feed1.is_some() {
                let (feed0, feed1) = (feeds.feed0, feeds.feed1);
                engine
                    .value_position_with_feeds(pool, lower, upper, liquidity, feed0, feed1, params)
                    .await
            } else if feeds.has_feed0.is_some() || feeds.has_feed1.is_some() {
                let has0 = feeds.has_feed0.unwrap_or(true);
                let has1 = feeds.has_feed1.unwrap_or(true);
                engine
                    .value_position_with_flags(pool, lower, upper, liquidity, has0, has1, params)
                    .await
            } else if ctx.has_registry {
                engine.value_position(pool, lower, upper, liquidity, params).await
            } else {
                let (feed0, feed1) = configured_handles(ctx, pool).await?;
                engine
                    .value_position_with_feeds(pool, lower, upper, liquidity, feed0, feed1, params)
                    .await
            }
        }
        Commands::Share { token, feeds, .. } => {
            let token = *token;
            if feeds.feed0.is_some() || feeds.feed1.is_some() {
                engine
                    .value_share_with_feeds(token, feeds.feed0, feeds.feed1, params)
                    .await
            } else if feeds.has_feed0.is_some() || feeds.has_feed1.is_some() {
                let has0 = feeds.has_feed0.unwrap_or(true);
                let has1 = feeds.has_feed1.unwrap_or(true);
                engine.value_share_with_flags(token, has0, has1, params).await
            } else if ctx.has_registry {
                engine.value_share(token, params).await
            } else {
                let pool = ctx.shares.pool(token).await?;
                let (feed0, feed1) = configured_handles(ctx, pool).await?;
                engine.value_share_with_feeds(token, feed0, feed1, params).await
            }
        }
    };
    Ok(valuation)
}

#[cfg(feature = "observability")]
fn init_metrics(cli: &Cli) -> Result<()> {
    if let Some(addr) = cli.metrics_addr {
        lp_valuation_sdk::metrics::install_prometheus_exporter(addr)?;
        log::info!("📊 Prometheus exporter listening on {}", addr);
    }
    Ok(())
}

#[cfg(not(feature = "observability"))]
fn init_metrics(_cli: &Cli) -> Result<()> {
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    env_logger::init();

    let cli = Cli::parse();

    init_metrics(&cli)?;

    let settings = Settings::from_path(&cli.config)
        .with_context(|| format!("failed to load settings from {}", cli.config.display()))?;
    let ctx = build(settings, &cli)?;

    match run(&ctx, &cli.command).await? {
        Ok(valuation) => {
            let report = Report::from_valuation(&valuation)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "💰 Value: {} USD ({} raw, 18 decimals)",
                    report.value_usd, report.value_usd_raw
                );
                for (name, price) in [("token0", &report.token0), ("token1", &report.token1)] {
                    if let Some(price) = price {
                        println!("   {} price: {} USD ({})", name, price.usd, price.source);
                    }
                }
            }
            Ok(())
        }
        Err(e) => {
            if cli.json {
                let body = serde_json::json!({ "error": e.kind(), "message": e.to_string() });
                println!("{}", serde_json::to_string_pretty(&body)?);
            }
            log::error!("❌ Valuation failed: {}", e);
            eprintln!("❌ Valuation failed: {}", e);
            std::process::exit(2);
        }
    }
}
