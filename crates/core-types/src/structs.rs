use crate::enums::{OrderSide, OrderStatus, OrderType};
use crate::ids::{AccountId, FillId, OrderId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A trading account as seen by callers. Balance fields live in the
/// ledger; this struct carries the slow-moving identity data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// Display name of the owning user, e.g. "Main Trading Account".
    pub owner: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// An open position in a single symbol on a single account.
///
/// `quantity` is signed: positive for long, negative for short. A
/// position that closes to zero is removed from the ledger entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub account_id: AccountId,
    pub symbol: String,
    pub quantity: Decimal,
    pub average_price: Decimal,
    pub last_updated: DateTime<Utc>,
}

/// The caller-supplied intent to trade. The core turns this into an
/// [`Order`] on admission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub account_id: AccountId,
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: Decimal,
    /// Required iff `order_type` is `Limit`.
    pub limit_price: Option<Decimal>,
}

/// An admitted order. Owned exclusively by the order book of its
/// account; read-only everywhere else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub account_id: AccountId,
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub limit_price: Option<Decimal>,
    pub status: OrderStatus,
    /// Populated when `status` is `Rejected`.
    pub reject_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Bumped on every committed transition; optimistic-concurrency tag
    /// for external consumers of order snapshots.
    pub version: u64,
    /// Carried through logs and errors so a whole submission can be
    /// traced end to end.
    pub correlation_id: Uuid,
}

impl Order {
    /// Builds a `PendingNew` order from a request. The admission decision
    /// (accept / reject) is taken by the order book.
    pub fn from_request(request: &OrderRequest) -> Self {
        Self {
            id: OrderId::new(),
            account_id: request.account_id,
            symbol: request.symbol.clone(),
            side: request.side,
            order_type: request.order_type,
            quantity: request.quantity,
            limit_price: request.limit_price,
            status: OrderStatus::PendingNew,
            reject_reason: None,
            created_at: Utc::now(),
            version: 0,
            correlation_id: Uuid::new_v4(),
        }
    }
}

/// A record of quantity executed against an order at a price.
///
/// Fills are append-only and immutable once recorded; an order
/// accumulates fills until `filled_quantity` reaches the order quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub fill_id: FillId,
    pub order_id: OrderId,
    pub filled_quantity: Decimal,
    pub fill_price: Decimal,
    pub timestamp: DateTime<Utc>,
}
