//! # Meridian Portfolio Aggregator
//!
//! Read-only projections over ledger state. Nothing here mutates an
//! account: the engine clones a ledger snapshot under the account lock,
//! releases the lock, fetches prices from the market-data collaborator,
//! and hands both to [`summarize`]. A symbol without a price is excluded
//! from the valuation and flagged in the response instead of failing the
//! whole summary.

use chrono::{DateTime, Utc};
use core_types::{AccountId, Position};
use ledger::AccountLedger;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The equity level P&L is measured against.
///
/// Captured when an account enters the engine (open or restart); the
/// core has no trading-calendar feed, so "daily" means "since this
/// baseline was taken".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityBaseline {
    pub equity: Decimal,
    pub taken_at: DateTime<Utc>,
}

impl EquityBaseline {
    pub fn new(equity: Decimal) -> Self {
        Self {
            equity,
            taken_at: Utc::now(),
        }
    }
}

/// The derived view of one account's worth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub account_id: AccountId,
    pub cash_balance: Decimal,
    /// Market value of all priceable positions, `Σ quantity * price`.
    pub positions_value: Decimal,
    pub total_value: Decimal,
    pub daily_pnl: Decimal,
    pub total_pnl: Decimal,
    /// Symbols excluded from `positions_value` because no current price
    /// was available.
    pub unpriced_symbols: Vec<String>,
    pub baseline_at: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
}

/// Projects a summary from a ledger snapshot and a set of current prices.
pub fn summarize(
    ledger: &AccountLedger,
    prices: &HashMap<String, Decimal>,
    baseline: &EquityBaseline,
) -> PortfolioSummary {
    let mut positions_value = Decimal::ZERO;
    let mut unpriced_symbols = Vec::new();

    for position in ledger.positions() {
        match prices.get(&position.symbol) {
            Some(price) => positions_value += position.quantity * price,
            None => unpriced_symbols.push(position.symbol.clone()),
        }
    }
    unpriced_symbols.sort();

    let total_value = ledger.cash_balance() + positions_value;

    PortfolioSummary {
        account_id: ledger.account_id(),
        cash_balance: ledger.cash_balance(),
        positions_value,
        total_value,
        daily_pnl: total_value - baseline.equity,
        total_pnl: total_value - ledger.net_deposits(),
        unpriced_symbols,
        baseline_at: baseline.taken_at,
        generated_at: Utc::now(),
    }
}

/// Positions of an account, sorted by symbol for stable output.
pub fn positions(ledger: &AccountLedger) -> Vec<Position> {
    let mut positions: Vec<Position> = ledger.positions().cloned().collect();
    positions.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    positions
}
