use core_types::{CoreError, OrderId, OrderStatus};
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrderBookError {
    #[error("Unknown order: {0}")]
    OrderNotFound(OrderId),

    #[error("Order {order_id} is {status}; the requested transition is not legal from that state")]
    InvalidState {
        order_id: OrderId,
        status: OrderStatus,
    },

    #[error("Fill quantity must be positive, got {0}")]
    InvalidFillQuantity(Decimal),

    #[error(
        "Fill of {attempted} on order {order_id} would exceed the order quantity; only {remaining} remains unfilled"
    )]
    Overfill {
        order_id: OrderId,
        attempted: Decimal,
        remaining: Decimal,
    },
}

impl From<OrderBookError> for CoreError {
    fn from(err: OrderBookError) -> Self {
        match err {
            OrderBookError::OrderNotFound(order_id) => CoreError::OrderNotFound(order_id),
            OrderBookError::InvalidState { order_id, status } => {
                CoreError::InvalidState { order_id, status }
            }
            other => CoreError::Validation(other.to_string()),
        }
    }
}
