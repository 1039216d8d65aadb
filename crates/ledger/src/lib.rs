//! # Meridian Account Ledger
//!
//! This crate owns cash balance, buying power and position quantities for
//! a single account, and enforces the balance invariants:
//!
//! - buying power never goes negative after a committed mutation;
//! - cash only changes via settled fills or explicit deposits/withdrawals;
//! - a position that closes to zero is removed.
//!
//! ## Architectural Principles
//!
//! - **Pure state, no I/O.** `AccountLedger` is a plain in-memory value.
//!   The engine serializes access per account and persists snapshots
//!   through the storage seam; this crate never suspends.
//! - **Reservation accounting.** A reservation is a temporary hold
//!   against buying power pending execution. `settle` converts (part of)
//!   a hold into a permanent cash movement; `release` returns the rest.
//!
//! ## Public API
//!
//! - `AccountLedger`: the per-account state machine.
//! - `ReservationToken`: handle returned by `reserve`, consumed by
//!   `settle`/`release`.
//! - `Settlement`: per-settlement outcome, carrying any buying-power
//!   shortfall a venue-reported cost caused.
//! - `LedgerError`: the specific error types that can be returned from this crate.

pub mod account;
pub mod error;

pub use account::{AccountLedger, ReservationToken, Settlement};
pub use error::LedgerError;
