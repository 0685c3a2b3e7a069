// src/feeds.rs

//! Feed resolution and price fetching.
//!
//! A token's feed is resolved once per valuation call, either through the
//! central registry (keyed by the token's canonical denomination against USD)
//! or from a caller-supplied handle. Registry failures never abort a call:
//! a reverting `getFeed` is the registry's way of saying "no such pair".

use ethers::types::Address;
use log::{debug, warn};

use crate::error::ValuationError;
use crate::metrics;
use crate::providers::{FeedRegistryProvider, PriceFeedProvider};
use crate::tokens::{Denominations, TokenRegistry};
use crate::types::{PriceSource, TokenPrice};

/// Outcome of a registry lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedLookup {
    Found(Address),
    NotFound,
    /// No registry configured on this deployment
    LookupUnsupported,
}

/// Per-token feed state for one valuation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedAvailability {
    Unavailable,
    Direct(Address),
    Registry(Address),
}

impl FeedAvailability {
    pub fn from_handle(handle: Option<Address>) -> Self {
        match handle {
            Some(feed) => Self::Direct(feed),
            None => Self::Unavailable,
        }
    }

    pub fn handle(&self) -> Option<Address> {
        match self {
            Self::Unavailable => None,
            Self::Direct(feed) | Self::Registry(feed) => Some(*feed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedFeeds {
    pub token0: FeedAvailability,
    pub token1: FeedAvailability,
}

impl ResolvedFeeds {
    /// Number of tokens with a usable feed (0, 1 or 2)
    pub fn count(&self) -> usize {
        [self.token0, self.token1]
            .iter()
            .filter(|f| f.handle().is_some())
            .count()
    }
}

pub struct FeedResolver<'a> {
    registry: Option<&'a dyn FeedRegistryProvider>,
    tokens: &'a TokenRegistry,
}

impl<'a> FeedResolver<'a> {
    pub fn new(registry: Option<&'a dyn FeedRegistryProvider>, tokens: &'a TokenRegistry) -> Self {
        Self { registry, tokens }
    }

    pub async fn lookup(&self, token: Address) -> FeedLookup {
        let Some(registry) = self.registry else {
            return FeedLookup::LookupUnsupported;
        };
        let base = self.tokens.denomination(token);
        match registry.feed_for(base, Denominations::USD).await {
            Ok(Some(feed)) => {
                debug!("Registry feed for {:?} (as {:?}): {:?}", token, base, feed);
                FeedLookup::Found(feed)
            }
            Ok(None) => {
                debug!("Registry has no USD feed for {:?}", token);
                FeedLookup::NotFound
            }
            Err(e) => {
                warn!("⚠️ Registry lookup for {:?} failed, treating as no feed: {:?}", token, e);
                metrics::increment_registry_lookup_failure();
                FeedLookup::NotFound
            }
        }
    }

    pub async fn via_registry(&self, token: Address) -> FeedAvailability {
        match self.lookup(token).await {
            FeedLookup::Found(feed) => FeedAvailability::Registry(feed),
            FeedLookup::NotFound | FeedLookup::LookupUnsupported => FeedAvailability::Unavailable,
        }
    }

    /// A `false` flag skips the registry read entirely.
    pub async fn via_flag(&self, token: Address, has_feed: bool) -> FeedAvailability {
        if !has_feed {
            return FeedAvailability::Unavailable;
        }
        self.via_registry(token).await
    }

    /// Registry result when found, otherwise the caller's handle.
    pub async fn via_handle(&self, token: Address, handle: Option<Address>) -> FeedAvailability {
        match self.lookup(token).await {
            FeedLookup::Found(feed) => FeedAvailability::Registry(feed),
            FeedLookup::NotFound | FeedLookup::LookupUnsupported => {
                FeedAvailability::from_handle(handle)
            }
        }
    }
}

/// Reads `feed` and checks it against `max_age` at `now`.
///
/// The answer must be strictly positive. An `updated_at` later than `now`
/// counts as age zero.
pub async fn fetch_price(
    feeds: &dyn PriceFeedProvider,
    feed: Address,
    max_age: u64,
    now: u64,
) -> Result<TokenPrice, ValuationError> {
    let reading = feeds.latest_price(feed).await?;

    if reading.answer.is_negative() || reading.answer.is_zero() {
        warn!("⚠️ Feed {:?} returned non-positive answer {}", feed, reading.answer);
        return Err(ValuationError::NoChainlinkPriceAvailable);
    }

    let age = now.saturating_sub(reading.updated_at);
    if age > max_age {
        warn!("⚠️ Feed {:?} is {}s old (max {}s)", feed, age, max_age);
        return Err(ValuationError::ChainlinkPriceTooOld { feed, age, max_age });
    }

    debug!("Feed {:?}: {} (age {}s)", feed, reading.answer, age);
    Ok(TokenPrice {
        value: reading.answer.into_raw(),
        source: PriceSource::Feed {
            feed,
            updated_at: reading.updated_at,
        },
    })
}
