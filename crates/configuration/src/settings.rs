use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

use crate::error::ConfigError;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub trading: TradingSettings,
    pub execution: ExecutionSettings,
    pub reconciliation: ReconciliationSettings,
}

/// Contains parameters that shape order admission and ledger maths.
#[derive(Debug, Clone, Deserialize)]
pub struct TradingSettings {
    /// Buying power is `cash * margin_multiplier - reserved`. A value of
    /// 1 models a plain cash account; 2 models 2x margin.
    pub margin_multiplier: Decimal,

    /// Market orders have no limit price, so the reservation is sized
    /// from the current reference price padded by this fraction.
    /// 0.05 means we reserve 5% above the quoted price.
    pub market_order_buffer_pct: Decimal,

    /// The set of symbols this core accepts orders for. An order in any
    /// other symbol is rejected at validation.
    pub symbols: Vec<String>,
}

/// Contains parameters for talking to the execution collaborator.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionSettings {
    /// How long a single order dispatch may take before it surfaces as a
    /// retryable timeout to the caller.
    pub submit_timeout_ms: u64,
}

/// Contains parameters for the background reconciliation sweep.
///
/// The sweep cadence is deliberately configurable rather than fixed:
/// the right interval depends on how quickly the downstream execution
/// venue acknowledges orders.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconciliationSettings {
    /// Seconds between sweep passes.
    pub sweep_interval_secs: u64,

    /// An accepted order older than this that still has no fills is
    /// logged as stale for operator attention.
    pub stale_order_age_secs: u64,
}

impl Config {
    /// Checks cross-field rules the type system cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trading.margin_multiplier < dec!(1) {
            return Err(ConfigError::ValidationError(
                "trading.margin_multiplier must be at least 1".to_string(),
            ));
        }
        if self.trading.market_order_buffer_pct < Decimal::ZERO {
            return Err(ConfigError::ValidationError(
                "trading.market_order_buffer_pct must not be negative".to_string(),
            ));
        }
        if self.trading.symbols.is_empty() {
            return Err(ConfigError::ValidationError(
                "trading.symbols must list at least one tradable symbol".to_string(),
            ));
        }
        if self.execution.submit_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "execution.submit_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
