//! # Meridian Storage Seam
//!
//! This crate is the boundary between the in-memory core and whatever
//! persistence a deployment chooses. The core never issues queries; it
//! commits whole per-account records and replays them on restart.
//!
//! ## Architectural Principles
//!
//! - **Transactional unit = one account.** A committed record carries
//!   ledger, positions and orders together, so a fill's cash movement and
//!   position change can never be persisted apart.
//! - **Adapter, not engine.** Persistence internals are out of scope for
//!   the core; `MemoryStore` is the reference implementation and test
//!   double, and a database-backed adapter slots in behind the same trait.
//!
//! ## Public API
//!
//! - `Storage`: the transactional commit/load trait.
//! - `AccountRecord`: the per-account unit of persistence.
//! - `MemoryStore`: in-memory `Storage` implementation.
//! - `StorageError`: the specific error types that can be returned from this crate.

pub mod error;
pub mod memory;

pub use error::StorageError;
pub use memory::MemoryStore;

use async_trait::async_trait;
use core_types::{Account, AccountId};
use ledger::AccountLedger;
use orderbook::OrderBook;
use serde::{Deserialize, Serialize};

/// Everything the core knows about one account, persisted as one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub account: Account,
    pub ledger: AccountLedger,
    pub book: OrderBook,
}

impl AccountRecord {
    pub fn account_id(&self) -> AccountId {
        self.account.id
    }
}

/// A generic trait for the transactional store behind the core.
///
/// `commit` must be atomic per account: either the whole record replaces
/// the previous one or nothing changes. The engine restores its in-memory
/// pre-image when a commit fails, so no partial state survives on either
/// side.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn commit(&self, record: AccountRecord) -> Result<(), StorageError>;

    /// Loads every persisted account record for restart replay.
    async fn load_all(&self) -> Result<Vec<AccountRecord>, StorageError>;
}
