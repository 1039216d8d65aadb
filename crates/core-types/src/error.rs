use crate::enums::OrderStatus;
use crate::ids::{AccountId, OrderId};
use rust_decimal::Decimal;
use thiserror::Error;

/// The error taxonomy every caller-facing operation resolves into.
///
/// Per-crate errors (`LedgerError`, `OrderBookError`, ...) stay close to
/// the code that raises them; the engine converts them into this enum at
/// the boundary so callers see one stable vocabulary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Credential could not be resolved to an identity")]
    Unauthorized,

    #[error("Identity is not permitted to act on account {account_id}")]
    Forbidden { account_id: AccountId },

    #[error("Order validation failed: {0}")]
    Validation(String),

    #[error("Insufficient buying power. Required: {required}, Available: {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    #[error("Order {order_id} is {status}; the requested transition is not legal from that state")]
    InvalidState {
        order_id: OrderId,
        status: OrderStatus,
    },

    #[error("Execution collaborator did not respond for order {order_id}; the order remains accepted and may be retried")]
    ExecutionTimeout { order_id: OrderId },

    #[error("Unknown account: {0}")]
    AccountNotFound(AccountId),

    #[error("Unknown order: {0}")]
    OrderNotFound(OrderId),

    #[error("Storage commit failed: {0}")]
    Storage(String),
}
