//! # Meridian Execution Seam
//!
//! The core does not match orders; it hands accepted orders to an
//! external execution collaborator (a broker or matching engine) and
//! receives fill/reject events back asynchronously. This crate defines
//! that contract and a scriptable in-process `PaperExecutor` used by
//! tests and the demo binary.
//!
//! ## Architectural Principles
//!
//! - **Dispatch after commit.** The engine commits the local `accepted`
//!   transition before calling `submit_order`, so a crash between commit
//!   and dispatch is recoverable by replaying undispatched orders.
//! - **Events, not return values.** Fills arrive on an mpsc channel, not
//!   as the response to `submit_order`; the submission response is only a
//!   ticket acknowledging receipt.

pub mod error;
pub mod event;
pub mod paper;

pub use error::ExecutionError;
pub use event::ExecutionEvent;
pub use paper::{PaperBehavior, PaperExecutor};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_types::{Order, OrderId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Receipt for an order handed to the execution collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionTicket {
    pub order_id: OrderId,
    /// The collaborator's own reference for the order.
    pub venue_ref: Uuid,
    pub accepted_at: DateTime<Utc>,
}

/// A generic trait for the execution collaborator.
///
/// Implementations must be safe to call concurrently; the engine never
/// holds an account lock across these calls.
#[async_trait]
pub trait ExecutionClient: Send + Sync {
    /// Hands an accepted order to the venue. A ticket only acknowledges
    /// receipt; fills arrive later as [`ExecutionEvent`]s.
    async fn submit_order(&self, order: &Order) -> Result<ExecutionTicket, ExecutionError>;

    /// Forwards a cancellation. Best effort: the local state machine has
    /// already transitioned when this is called.
    async fn cancel_order(&self, order_id: OrderId) -> Result<(), ExecutionError>;
}
