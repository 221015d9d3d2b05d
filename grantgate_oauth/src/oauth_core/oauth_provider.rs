//! Storage contract the grant resolver and revocation handler depend on.

use async_trait::async_trait;
use uuid::Uuid;

use super::types::{Account, ExternalIdentity, ExternalLink, OAuthError};

/// How a social login was resolved against the store.
#[derive(Debug, Clone)]
pub enum ExternalResolution {
    /// An account was already linked to this external identity.
    Authenticated(Account),
    /// An account with a matching identifier was linked to the identity.
    Linked(Account),
    /// A new account was created for the identity.
    Provisioned(Account),
}

impl ExternalResolution {
    pub fn account(&self) -> &Account {
        match self {
            ExternalResolution::Authenticated(account)
            | ExternalResolution::Linked(account)
            | ExternalResolution::Provisioned(account) => account,
        }
    }

    pub fn into_account(self) -> Account {
        match self {
            ExternalResolution::Authenticated(account)
            | ExternalResolution::Linked(account)
            | ExternalResolution::Provisioned(account) => account,
        }
    }
}

/// Trait for the store that owns accounts and their token lifecycle.
///
/// Identifiers are compared in their normalized form (see
/// [`normalize_identifier`](super::types::normalize_identifier)).
#[async_trait]
pub trait AccountStore: Send + Sync + 'static {
    /// Look up an account by its login identifier.
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Account>, OAuthError>;

    /// Look up the account linked to an external identity.
    async fn find_by_uid(&self, link: &ExternalLink) -> Result<Option<Account>, OAuthError>;

    /// Look up the account currently holding `token`.
    async fn find_by_token(&self, token: &str) -> Result<Option<Account>, OAuthError>;

    /// Check `password` against the account's stored hash.
    async fn verify_password(&self, account_id: Uuid, password: &str) -> Result<bool, OAuthError>;

    /// Create an account and issue its first token.
    ///
    /// Fails with [`OAuthError::AccountConflict`] if the identifier or the
    /// external link is already taken.
    async fn create_account(
        &self,
        identifier: &str,
        password: Option<&str>,
        external: Option<ExternalLink>,
    ) -> Result<Account, OAuthError>;

    /// Link an existing account to an external identity.
    ///
    /// Fails with [`OAuthError::AccountConflict`] if the link belongs to
    /// another account or the account is linked to a different identity.
    async fn link_uid(&self, account_id: Uuid, link: ExternalLink) -> Result<Account, OAuthError>;

    /// Return the account's token, issuing one if it has none yet.
    async fn issue_token(&self, account_id: Uuid) -> Result<String, OAuthError>;

    /// Replace the account's token with a fresh one, provided it still holds
    /// `current`. Returns the new token, or `None` if the token had already
    /// changed.
    async fn rotate_token(
        &self,
        account_id: Uuid,
        current: &str,
    ) -> Result<Option<String>, OAuthError>;

    /// Atomically resolve a verified external identity to an account:
    /// authenticate by link, link by identifier, or provision a new account.
    async fn upsert_external(
        &self,
        identity: &ExternalIdentity,
    ) -> Result<ExternalResolution, OAuthError>;
}
