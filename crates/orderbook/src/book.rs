use crate::error::OrderBookError;
use core_types::{Fill, FillId, Order, OrderId, OrderSide, OrderStatus};
use ledger::ReservationToken;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// An order together with its fill history and reservation bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order: Order,
    pub fills: Vec<Fill>,
    /// Cumulative quantity across all applied fills.
    pub filled_quantity: Decimal,
    /// The buying-power hold backing this order. `None` only for orders
    /// that were rejected at admission and never reserved anything.
    pub reservation: Option<ReservationToken>,
    /// Hold consumed per unit filled: `estimated_cost / quantity`. Zero
    /// for orders that reserved nothing (plain sells).
    pub reserve_per_unit: Decimal,
    /// Whether the order has been handed to the execution collaborator.
    /// Orders accepted but not yet dispatched are picked up by the
    /// reconciliation sweep.
    pub dispatched: bool,
    /// Fill ids already applied; the idempotency guard.
    applied_fill_ids: HashSet<FillId>,
}

/// The ledger effects of one applied fill, computed by the book and
/// applied by the engine under the same account lock.
#[derive(Debug, Clone, PartialEq)]
pub struct FillApplication {
    pub order_id: OrderId,
    pub symbol: String,
    pub side: OrderSide,
    pub fill_quantity: Decimal,
    pub fill_price: Decimal,
    /// Portion of the hold consumed by this fill.
    pub reserved_delta: Decimal,
    /// Signed cash movement: positive debits the account (buy), negative
    /// credits it (sell).
    pub cash_delta: Decimal,
    pub reservation: ReservationToken,
    /// `true` when this fill completed the order.
    pub completed: bool,
}

/// Result of presenting a fill to the book.
#[derive(Debug, Clone, PartialEq)]
pub enum FillOutcome {
    /// The fill was applied; the ledger effects are attached.
    Applied(FillApplication),
    /// This `fill_id` was already applied; nothing changed.
    Duplicate,
    /// The order reached a terminal state before the fill arrived (e.g.
    /// a cancel won the race); nothing changed.
    Superseded(OrderStatus),
}

/// Result of a successful cancel.
#[derive(Debug, Clone, PartialEq)]
pub struct CancelOutcome {
    pub order: Order,
    /// The hold to release back to buying power, when one is still open.
    pub reservation: Option<ReservationToken>,
}

/// All orders of a single account, keyed by order id.
///
/// The book is owned by the account's serialization domain in the engine;
/// no internal locking happens here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderBook {
    orders: HashMap<OrderId, OrderRecord>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self {
            orders: HashMap::new(),
        }
    }

    /// Admits a validated order whose reservation succeeded. The order
    /// transitions `pending_new -> accepted`.
    pub fn admit(
        &mut self,
        mut order: Order,
        reservation: ReservationToken,
        reserve_per_unit: Decimal,
    ) -> Order {
        order.status = OrderStatus::Accepted;
        order.version += 1;
        let record = OrderRecord {
            order: order.clone(),
            fills: Vec::new(),
            filled_quantity: Decimal::ZERO,
            reservation: Some(reservation),
            reserve_per_unit,
            dispatched: false,
            applied_fill_ids: HashSet::new(),
        };
        self.orders.insert(order.id, record);
        order
    }

    /// Records an order that failed validation or funding. The order
    /// transitions `pending_new -> rejected` and stays queryable.
    pub fn record_rejected(&mut self, mut order: Order, reason: impl Into<String>) -> Order {
        order.status = OrderStatus::Rejected;
        order.reject_reason = Some(reason.into());
        order.version += 1;
        let record = OrderRecord {
            order: order.clone(),
            fills: Vec::new(),
            filled_quantity: Decimal::ZERO,
            reservation: None,
            reserve_per_unit: Decimal::ZERO,
            dispatched: false,
            applied_fill_ids: HashSet::new(),
        };
        self.orders.insert(order.id, record);
        order
    }

    /// Applies a fill event.
    ///
    /// Duplicates (same `fill_id`) and fills arriving after a terminal
    /// state are idempotent no-ops reported through [`FillOutcome`];
    /// overfills and malformed quantities are hard errors because they
    /// indicate a misbehaving execution collaborator.
    pub fn apply_fill(&mut self, fill: &Fill) -> Result<FillOutcome, OrderBookError> {
        let record = self
            .orders
            .get_mut(&fill.order_id)
            .ok_or(OrderBookError::OrderNotFound(fill.order_id))?;

        if record.applied_fill_ids.contains(&fill.fill_id) {
            tracing::warn!(
                order_id = %fill.order_id,
                fill_id = %fill.fill_id,
                "duplicate fill ignored"
            );
            return Ok(FillOutcome::Duplicate);
        }
        if !record.order.status.is_live() {
            tracing::warn!(
                order_id = %fill.order_id,
                fill_id = %fill.fill_id,
                status = %record.order.status,
                "fill arrived after terminal state; ignored"
            );
            return Ok(FillOutcome::Superseded(record.order.status));
        }
        if fill.filled_quantity <= Decimal::ZERO {
            return Err(OrderBookError::InvalidFillQuantity(fill.filled_quantity));
        }

        let remaining = record.order.quantity - record.filled_quantity;
        if fill.filled_quantity > remaining {
            return Err(OrderBookError::Overfill {
                order_id: fill.order_id,
                attempted: fill.filled_quantity,
                remaining,
            });
        }

        let reservation = record.reservation.clone().ok_or(OrderBookError::InvalidState {
            order_id: fill.order_id,
            status: record.order.status,
        })?;

        record.fills.push(fill.clone());
        record.applied_fill_ids.insert(fill.fill_id);
        record.filled_quantity += fill.filled_quantity;

        let completed = record.filled_quantity == record.order.quantity;
        record.order.status = if completed {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
        record.order.version += 1;

        Ok(FillOutcome::Applied(FillApplication {
            order_id: fill.order_id,
            symbol: record.order.symbol.clone(),
            side: record.order.side,
            fill_quantity: fill.filled_quantity,
            fill_price: fill.fill_price,
            reserved_delta: record.reserve_per_unit * fill.filled_quantity,
            cash_delta: record.order.side.sign() * fill.filled_quantity * fill.fill_price,
            reservation,
            completed,
        }))
    }

    /// Cancels a live order. From a terminal state this fails with
    /// `InvalidState` naming the state that was hit, so the caller learns
    /// whether the order filled, was already cancelled, or was rejected.
    pub fn cancel(&mut self, order_id: OrderId) -> Result<CancelOutcome, OrderBookError> {
        let record = self
            .orders
            .get_mut(&order_id)
            .ok_or(OrderBookError::OrderNotFound(order_id))?;

        if !record.order.status.is_live() {
            return Err(OrderBookError::InvalidState {
                order_id,
                status: record.order.status,
            });
        }

        record.order.status = OrderStatus::Cancelled;
        record.order.version += 1;

        Ok(CancelOutcome {
            order: record.order.clone(),
            reservation: record.reservation.clone(),
        })
    }

    /// Applies an asynchronous reject from the execution collaborator.
    /// Rejects racing a fill or cancel that already terminalized the
    /// order are no-ops, mirroring the fill path.
    pub fn apply_reject(
        &mut self,
        order_id: OrderId,
        reason: impl Into<String>,
    ) -> Result<Option<CancelOutcome>, OrderBookError> {
        let record = self
            .orders
            .get_mut(&order_id)
            .ok_or(OrderBookError::OrderNotFound(order_id))?;

        if !record.order.status.is_live() {
            return Ok(None);
        }

        record.order.status = OrderStatus::Rejected;
        record.order.reject_reason = Some(reason.into());
        record.order.version += 1;

        Ok(Some(CancelOutcome {
            order: record.order.clone(),
            reservation: record.reservation.clone(),
        }))
    }

    /// Marks an order as handed to the execution collaborator.
    pub fn mark_dispatched(&mut self, order_id: OrderId) {
        if let Some(record) = self.orders.get_mut(&order_id) {
            record.dispatched = true;
        }
    }

    pub fn get(&self, order_id: OrderId) -> Option<&OrderRecord> {
        self.orders.get(&order_id)
    }

    /// All orders, optionally filtered by status, newest first.
    pub fn list(&self, status_filter: Option<OrderStatus>) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .values()
            .filter(|record| status_filter.is_none_or(|status| record.order.status == status))
            .map(|record| record.order.clone())
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }

    /// Accepted orders that were never handed to execution, the ones a
    /// restart or reconciliation sweep must re-dispatch.
    pub fn undispatched(&self) -> Vec<Order> {
        self.orders
            .values()
            .filter(|record| record.order.status.is_live() && !record.dispatched)
            .map(|record| record.order.clone())
            .collect()
    }
}
