use crate::error::ExecutionError;
use crate::event::ExecutionEvent;
use crate::{ExecutionClient, ExecutionTicket};
use async_trait::async_trait;
use chrono::Utc;
use core_types::{Fill, FillId, Order, OrderId, OrderType};
use rust_decimal::Decimal;
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

/// How the paper executor reacts to a submitted order.
#[derive(Debug, Clone, PartialEq)]
pub enum PaperBehavior {
    /// Acknowledge and do nothing further; the test injects fills itself.
    AcknowledgeOnly,
    /// Acknowledge, then emit one full fill: limit orders at their limit
    /// price, market orders at `market_price`.
    FillImmediately { market_price: Decimal },
    /// Acknowledge, then emit a reject event with this reason.
    RejectAfterAck { reason: String },
    /// Never answer; the engine's submit timeout fires.
    Unresponsive,
}

/// An in-process execution collaborator for tests and the demo binary.
///
/// It emits [`ExecutionEvent`]s on the channel the engine's event pump
/// consumes; `event_sender` hands out extra senders so a test can inject
/// arbitrary events (duplicates, late fills) directly.
pub struct PaperExecutor {
    events_tx: mpsc::Sender<ExecutionEvent>,
    behavior: RwLock<PaperBehavior>,
}

impl PaperExecutor {
    /// Creates the executor plus the event channel the engine consumes.
    pub fn new(behavior: PaperBehavior) -> (Self, mpsc::Receiver<ExecutionEvent>) {
        let (events_tx, events_rx) = mpsc::channel(64);
        (
            Self {
                events_tx,
                behavior: RwLock::new(behavior),
            },
            events_rx,
        )
    }

    pub async fn set_behavior(&self, behavior: PaperBehavior) {
        *self.behavior.write().await = behavior;
    }

    /// A sender onto the engine's event channel, for injecting events
    /// from tests.
    pub fn event_sender(&self) -> mpsc::Sender<ExecutionEvent> {
        self.events_tx.clone()
    }

    async fn emit(&self, event: ExecutionEvent) {
        // The engine owns the receiving side; if it is gone the events
        // have nowhere to go and dropping them is all that is left.
        if self.events_tx.send(event).await.is_err() {
            tracing::warn!("event channel closed; paper execution event dropped");
        }
    }
}

#[async_trait]
impl ExecutionClient for PaperExecutor {
    async fn submit_order(&self, order: &Order) -> Result<ExecutionTicket, ExecutionError> {
        let behavior = self.behavior.read().await.clone();
        match behavior {
            PaperBehavior::Unresponsive => {
                tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
                Err(ExecutionError::Timeout)
            }
            PaperBehavior::AcknowledgeOnly => Ok(ticket(order.id)),
            PaperBehavior::FillImmediately { market_price } => {
                let fill_price = match order.order_type {
                    OrderType::Limit => order.limit_price.unwrap_or(market_price),
                    OrderType::Market => market_price,
                };
                self.emit(ExecutionEvent::Fill(Fill {
                    fill_id: FillId::new(),
                    order_id: order.id,
                    filled_quantity: order.quantity,
                    fill_price,
                    timestamp: Utc::now(),
                }))
                .await;
                Ok(ticket(order.id))
            }
            PaperBehavior::RejectAfterAck { reason } => {
                self.emit(ExecutionEvent::Reject {
                    order_id: order.id,
                    reason,
                })
                .await;
                Ok(ticket(order.id))
            }
        }
    }

    async fn cancel_order(&self, order_id: OrderId) -> Result<(), ExecutionError> {
        tracing::debug!(%order_id, "paper executor acknowledged cancel");
        Ok(())
    }
}

fn ticket(order_id: OrderId) -> ExecutionTicket {
    ExecutionTicket {
        order_id,
        venue_ref: Uuid::new_v4(),
        accepted_at: Utc::now(),
    }
}
