//! # Meridian Market Data
//!
//! The core does not parse market-data feeds; it only needs a current
//! price per symbol for reservation sizing and portfolio valuation. This
//! crate defines that seam and a static implementation for tests and the
//! demo binary.

pub mod error;

pub use error::PriceError;

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// A generic trait for current-price lookup.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Returns the current price for `symbol`, or `Unavailable` when the
    /// collaborator has no quote for it.
    async fn current_price(&self, symbol: &str) -> Result<Decimal, PriceError>;
}

/// A price source backed by an in-memory map.
///
/// Tests and the demo binary seed it with fixed quotes; `set_price` and
/// `remove_price` let a test move the market mid-scenario.
pub struct StaticPriceSource {
    prices: RwLock<HashMap<String, Decimal>>,
}

impl StaticPriceSource {
    pub fn new() -> Self {
        Self {
            prices: RwLock::new(HashMap::new()),
        }
    }

    pub async fn set_price(&self, symbol: impl Into<String>, price: Decimal) {
        self.prices.write().await.insert(symbol.into(), price);
    }

    /// Drops the quote for `symbol`, making later lookups fail with
    /// `Unavailable`.
    pub async fn remove_price(&self, symbol: &str) {
        self.prices.write().await.remove(symbol);
    }
}

impl Default for StaticPriceSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceSource for StaticPriceSource {
    async fn current_price(&self, symbol: &str) -> Result<Decimal, PriceError> {
        self.prices
            .read()
            .await
            .get(symbol)
            .copied()
            .ok_or_else(|| PriceError::Unavailable(symbol.to_string()))
    }
}
