use crate::error::LedgerError;
use chrono::Utc;
use core_types::{AccountId, Position};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Handle for a buying-power hold created by [`AccountLedger::reserve`].
///
/// The token is inert on its own; the ledger keeps the authoritative
/// remaining amount keyed by `reservation_id`, which is what makes
/// `release` idempotent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationToken {
    pub reservation_id: Uuid,
    /// The amount originally reserved. The remaining hold may be lower
    /// after partial settlements.
    pub amount: Decimal,
}

/// Result of converting (part of) a hold into a cash movement.
///
/// A fill is a fact reported by the venue and is always recorded, even
/// when its cost exceeds what was reserved; `shortfall` carries that
/// overrun so the caller can route it to reconciliation instead of
/// fishing it out of logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    /// Portion of the hold consumed by this settlement.
    pub consumed: Decimal,
    /// Magnitude by which buying power is negative after the settlement;
    /// zero when the cost was fully covered.
    pub shortfall: Decimal,
}

/// The cash, reservation and position state of one trading account.
///
/// All mutations for an account are serialized by the engine; this type
/// itself is single-threaded and cheap to clone for snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountLedger {
    account_id: AccountId,
    cash_balance: Decimal,
    /// Buying power is `cash * margin_multiplier - reserved`. 1 models a
    /// cash account.
    margin_multiplier: Decimal,
    /// Sum of all live reservation remainders.
    reserved: Decimal,
    /// Net of deposits minus withdrawals; the P&L baseline.
    net_deposits: Decimal,
    positions: HashMap<String, Position>,
    /// Remaining hold per live reservation.
    reservations: HashMap<Uuid, Decimal>,
}

impl AccountLedger {
    pub fn new(account_id: AccountId, margin_multiplier: Decimal) -> Self {
        Self {
            account_id,
            cash_balance: Decimal::ZERO,
            margin_multiplier,
            reserved: Decimal::ZERO,
            net_deposits: Decimal::ZERO,
            positions: HashMap::new(),
            reservations: HashMap::new(),
        }
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn cash_balance(&self) -> Decimal {
        self.cash_balance
    }

    pub fn reserved(&self) -> Decimal {
        self.reserved
    }

    pub fn net_deposits(&self) -> Decimal {
        self.net_deposits
    }

    pub fn margin_multiplier(&self) -> Decimal {
        self.margin_multiplier
    }

    /// Cash plus margin credit minus current reservations.
    pub fn buying_power(&self) -> Decimal {
        self.cash_balance * self.margin_multiplier - self.reserved
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    /// Signed quantity held in `symbol`; zero when no position exists.
    pub fn position_quantity(&self, symbol: &str) -> Decimal {
        self.positions
            .get(symbol)
            .map(|p| p.quantity)
            .unwrap_or(Decimal::ZERO)
    }

    /// Credits external funds to the account.
    pub fn deposit(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount(amount));
        }
        self.cash_balance += amount;
        self.net_deposits += amount;
        Ok(())
    }

    /// Debits external funds. Fails without side effect when the
    /// withdrawal would push buying power negative.
    pub fn withdraw(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount(amount));
        }
        let remaining_power = (self.cash_balance - amount) * self.margin_multiplier - self.reserved;
        if remaining_power < Decimal::ZERO {
            return Err(LedgerError::InsufficientFunds {
                required: amount,
                available: self.buying_power(),
            });
        }
        self.cash_balance -= amount;
        self.net_deposits -= amount;
        Ok(())
    }

    /// Atomically checks `buying_power >= amount` and places a hold for
    /// `amount`. Fails with `InsufficientFunds` without side effect when
    /// the check fails. A zero-amount reservation always succeeds, which
    /// lets every order carry a token regardless of side.
    pub fn reserve(&mut self, amount: Decimal) -> Result<ReservationToken, LedgerError> {
        if amount < Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount(amount));
        }
        let available = self.buying_power();
        if amount > available {
            return Err(LedgerError::InsufficientFunds {
                required: amount,
                available,
            });
        }
        let token = ReservationToken {
            reservation_id: Uuid::new_v4(),
            amount,
        };
        self.reserved += amount;
        self.reservations.insert(token.reservation_id, amount);
        Ok(token)
    }

    /// Returns whatever remains of a hold to buying power. Idempotent: a
    /// token that was already released or fully settled is a no-op.
    /// Returns the amount actually released.
    pub fn release(&mut self, token: &ReservationToken) -> Decimal {
        match self.reservations.remove(&token.reservation_id) {
            Some(remaining) => {
                self.reserved -= remaining;
                remaining
            }
            None => Decimal::ZERO,
        }
    }

    /// Converts up to `reserved_delta` of the hold into a permanent cash
    /// movement of `actual_cost` (positive debits cash, negative credits
    /// it; a sell settles with negative cost). Any gap between the
    /// consumed hold and the actual cost returns to buying power
    /// implicitly, e.g. a fill at a better price than was reserved.
    /// The returned [`Settlement`] reports the consumed portion and any
    /// buying-power shortfall the cost caused.
    pub fn settle(
        &mut self,
        token: &ReservationToken,
        reserved_delta: Decimal,
        actual_cost: Decimal,
    ) -> Settlement {
        let consumed = match self.reservations.get_mut(&token.reservation_id) {
            Some(remaining) => {
                let consumed = reserved_delta.min(*remaining);
                *remaining -= consumed;
                if remaining.is_zero() {
                    self.reservations.remove(&token.reservation_id);
                }
                consumed
            }
            None => Decimal::ZERO,
        };
        self.reserved -= consumed;
        self.cash_balance -= actual_cost;

        let buying_power = self.buying_power();
        Settlement {
            consumed,
            shortfall: if buying_power < Decimal::ZERO {
                -buying_power
            } else {
                Decimal::ZERO
            },
        }
    }

    /// Updates the position in `symbol` by a signed fill quantity at
    /// `price`. Average price blends on increase, holds on reduction, and
    /// resets when the position flips sign. Closing to zero removes the
    /// position.
    ///
    /// Cash movement belongs to [`settle`](Self::settle); the engine calls
    /// both under the same account lock and commits them in one storage
    /// transaction.
    pub fn apply_fill(
        &mut self,
        symbol: &str,
        signed_quantity: Decimal,
        price: Decimal,
    ) -> Result<(), LedgerError> {
        if signed_quantity.is_zero() {
            return Err(LedgerError::ZeroQuantityFill);
        }

        let account_id = self.account_id;
        let position = self
            .positions
            .entry(symbol.to_string())
            .or_insert_with(|| Position {
                account_id,
                symbol: symbol.to_string(),
                quantity: Decimal::ZERO,
                average_price: Decimal::ZERO,
                last_updated: Utc::now(),
            });

        let old_quantity = position.quantity;
        let new_quantity = old_quantity + signed_quantity;
        let increases = old_quantity.is_zero()
            || old_quantity.is_sign_positive() == signed_quantity.is_sign_positive();

        if increases {
            // Opening or adding: blend the average entry price.
            let existing_value = position.average_price * old_quantity.abs();
            let added_value = price * signed_quantity.abs();
            position.average_price = (existing_value + added_value) / new_quantity.abs();
        } else if new_quantity.is_zero()
            || old_quantity.is_sign_positive() != new_quantity.is_sign_positive()
        {
            // Crossed through flat: whatever remains was opened at the
            // fill price.
            position.average_price = price;
        }
        // Plain reduction keeps the existing average price.

        position.quantity = new_quantity;
        position.last_updated = Utc::now();

        if position.quantity.is_zero() {
            self.positions.remove(symbol);
        }

        Ok(())
    }
}
