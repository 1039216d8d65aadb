//! # Meridian Core Types
//!
//! This crate defines the shared domain vocabulary for the trading core:
//! accounts, orders, fills, positions and the error taxonomy every other
//! crate maps its failures into.
//!
//! As a Layer 0 crate it has no workspace dependencies; everything else
//! depends on it.

pub mod enums;
pub mod error;
pub mod ids;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{OrderSide, OrderStatus, OrderType};
pub use error::CoreError;
pub use ids::{AccountId, FillId, OrderId};
pub use structs::{Account, Fill, Order, OrderRequest, Position};
