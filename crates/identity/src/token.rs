use crate::error::IdentityError;
use crate::{Authenticator, Identity};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use core_types::AccountId;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

/// A token issued by [`TokenAuthenticator::issue`].
#[derive(Debug, Clone)]
struct IssuedToken {
    identity: Identity,
    expires_at: DateTime<Utc>,
}

/// An in-process bearer-token authenticator.
///
/// Tokens are opaque random strings mapped to identities with an expiry.
/// This is the implementation used by tests and the demo binary; a
/// deployment would put a real identity-provider client behind the
/// [`Authenticator`] trait instead.
pub struct TokenAuthenticator {
    tokens: RwLock<HashMap<String, IssuedToken>>,
}

impl TokenAuthenticator {
    pub fn new() -> Self {
        Self {
            tokens: RwLock::new(HashMap::new()),
        }
    }

    /// Issues a new bearer token for `user` covering `account_ids`,
    /// valid for `ttl`. Returns the opaque credential string.
    pub async fn issue(
        &self,
        user: impl Into<String>,
        account_ids: HashSet<AccountId>,
        ttl: Duration,
    ) -> String {
        let token = Uuid::new_v4().to_string();
        let issued = IssuedToken {
            identity: Identity {
                user: user.into(),
                account_ids,
            },
            expires_at: Utc::now() + ttl,
        };
        self.tokens.write().await.insert(token.clone(), issued);
        token
    }

    /// Revokes a token before its natural expiry. Unknown tokens are a
    /// no-op.
    pub async fn revoke(&self, credential: &str) {
        self.tokens.write().await.remove(credential);
    }
}

impl Default for TokenAuthenticator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Authenticator for TokenAuthenticator {
    async fn authenticate(&self, credential: &str) -> Result<Identity, IdentityError> {
        let tokens = self.tokens.read().await;
        match tokens.get(credential) {
            Some(issued) if issued.expires_at > Utc::now() => Ok(issued.identity.clone()),
            Some(_) => {
                tracing::debug!("rejected expired credential");
                Err(IdentityError::Unauthorized)
            }
            None => Err(IdentityError::Unauthorized),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account_set(id: AccountId) -> HashSet<AccountId> {
        let mut set = HashSet::new();
        set.insert(id);
        set
    }

    #[tokio::test]
    async fn issued_token_resolves_to_identity() {
        let auth = TokenAuthenticator::new();
        let account_id = AccountId::new();
        let token = auth
            .issue("alice", account_set(account_id), Duration::minutes(5))
            .await;

        let identity = auth.authenticate(&token).await.unwrap();
        assert_eq!(identity.user, "alice");
        assert!(identity.can_access(account_id));
        assert!(!identity.can_access(AccountId::new()));
    }

    #[tokio::test]
    async fn unknown_credential_is_unauthorized() {
        let auth = TokenAuthenticator::new();
        let err = auth.authenticate("not-a-token").await.unwrap_err();
        assert_eq!(err, IdentityError::Unauthorized);
    }

    #[tokio::test]
    async fn expired_token_is_unauthorized() {
        let auth = TokenAuthenticator::new();
        let token = auth
            .issue("bob", account_set(AccountId::new()), Duration::seconds(-1))
            .await;
        let err = auth.authenticate(&token).await.unwrap_err();
        assert_eq!(err, IdentityError::Unauthorized);
    }

    #[tokio::test]
    async fn revoked_token_is_unauthorized() {
        let auth = TokenAuthenticator::new();
        let token = auth
            .issue("carol", account_set(AccountId::new()), Duration::minutes(5))
            .await;
        auth.revoke(&token).await;
        assert!(auth.authenticate(&token).await.is_err());
    }
}
