use chrono::{DateTime, Utc};
use core_types::{Account, AccountId};
use ledger::AccountLedger;
use orderbook::OrderBook;
use portfolio::EquityBaseline;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use storage::AccountRecord;

/// Everything owned by one account's serialization domain. The engine
/// wraps this in `Arc<Mutex<..>>`; every ledger or book mutation for the
/// account happens while that mutex is held.
#[derive(Debug, Clone)]
pub(crate) struct AccountState {
    pub account: Account,
    pub ledger: AccountLedger,
    pub book: OrderBook,
    /// P&L baseline; not persisted, resets on restart and shifts with
    /// deposits/withdrawals so transfers do not show up as P&L.
    pub baseline: EquityBaseline,
}

impl AccountState {
    /// The persistence image of this state. Baseline is derived, not
    /// stored.
    pub fn record(&self) -> AccountRecord {
        AccountRecord {
            account: self.account.clone(),
            ledger: self.ledger.clone(),
            book: self.book.clone(),
        }
    }

    /// Rebuilds state from a persisted record. The baseline is seeded
    /// from cash plus positions valued at their average entry price,
    /// the best estimate available without a market-data call.
    pub fn from_record(record: AccountRecord) -> Self {
        let positions_value: Decimal = record
            .ledger
            .positions()
            .map(|p| p.quantity * p.average_price)
            .sum();
        let baseline = EquityBaseline::new(record.ledger.cash_balance() + positions_value);
        Self {
            account: record.account,
            ledger: record.ledger,
            book: record.book,
            baseline,
        }
    }
}

/// Caller-facing snapshot of an account's balances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountView {
    pub id: AccountId,
    pub owner: String,
    pub is_active: bool,
    pub cash_balance: Decimal,
    pub buying_power: Decimal,
    pub reserved: Decimal,
    pub created_at: DateTime<Utc>,
}

impl AccountView {
    pub(crate) fn from_state(state: &AccountState) -> Self {
        Self {
            id: state.account.id,
            owner: state.account.owner.clone(),
            is_active: state.account.is_active,
            cash_balance: state.ledger.cash_balance(),
            buying_power: state.ledger.buying_power(),
            reserved: state.ledger.reserved(),
            created_at: state.account.created_at,
        }
    }
}
