use core_types::{Fill, OrderId};
use serde::{Deserialize, Serialize};

/// Asynchronous events delivered from the execution collaborator back
/// into the core. The engine's event pump applies them under the owning
/// account's lock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecutionEvent {
    /// Quantity executed against an order.
    Fill(Fill),
    /// The venue rejected the order after acknowledging it.
    Reject { order_id: OrderId, reason: String },
}
