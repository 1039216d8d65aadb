//! # Meridian Order Book
//!
//! The per-account order lifecycle state machine. The book owns every
//! order of its account and is the only place order status changes:
//!
//! ```text
//! pending_new ──► accepted ──► {partially_filled}* ──► filled
//!                    │                 │
//!                    ├──► cancelled ◄──┘
//!                    └──► rejected
//! ```
//!
//! Fills are idempotent by `fill_id`: a duplicate or late fill (after a
//! terminal state) never double-applies; it is logged here and reported
//! as a no-op outcome the engine can move past. Illegal transitions
//! (cancel on a filled order) fail with the terminal state that was hit.
//!
//! The book is pure in-memory state; ledger effects of a fill are
//! *computed* here (hold consumption, signed cash delta) but *applied* by
//! the engine under the same account lock.

pub mod book;
pub mod error;

pub use book::{CancelOutcome, FillApplication, FillOutcome, OrderBook, OrderRecord};
pub use error::OrderBookError;
