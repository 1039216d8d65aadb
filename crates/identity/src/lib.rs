//! # Meridian Identity Context
//!
//! Resolves an opaque credential into a stable identity carrying the set
//! of accounts the caller may act on. The engine checks that set before
//! touching any account state, so an authorization failure can never
//! leave a partial mutation behind.
//!
//! ## Public API
//!
//! - `Authenticator`: the trait the engine consumes; swap in a real
//!   identity-provider client in production.
//! - `TokenAuthenticator`: an in-process implementation issuing opaque
//!   bearer tokens with an expiry.
//! - `Identity`: the resolved caller.
//! - `IdentityError`: the specific error types that can be returned from this crate.

pub mod error;
pub mod token;

pub use error::IdentityError;
pub use token::TokenAuthenticator;

use async_trait::async_trait;
use core_types::AccountId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The resolved identity of a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Display name of the user, e.g. an email or login.
    pub user: String,
    /// The accounts this identity may act on.
    pub account_ids: HashSet<AccountId>,
}

impl Identity {
    /// Returns `true` if this identity may act on `account_id`.
    pub fn can_access(&self, account_id: AccountId) -> bool {
        self.account_ids.contains(&account_id)
    }
}

/// A generic trait for credential resolution.
///
/// The core is agnostic about where identities come from; anything that
/// can turn an opaque credential into an [`Identity`] plugs in here.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Resolves `credential` into an identity, or `Unauthorized` when the
    /// credential is unknown, malformed or expired.
    async fn authenticate(&self, credential: &str) -> Result<Identity, IdentityError>;
}
