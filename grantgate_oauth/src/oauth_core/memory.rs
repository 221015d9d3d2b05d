//! In-memory default implementation of [`AccountStore`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::crypto::{
    DUMMY_PASSWORD_HASH, generate_token, hash_password_blocking, verify_password_blocking,
};
use super::oauth_provider::{AccountStore, ExternalResolution};
use super::types::{Account, ExternalIdentity, ExternalLink, OAuthError, normalize_identifier};

/// Accounts plus the unique indexes over them. Every mutation keeps the
/// indexes in step with `accounts`.
#[derive(Default)]
struct AccountTable {
    accounts: HashMap<Uuid, Account>,
    by_identifier: HashMap<String, Uuid>,
    by_link: HashMap<ExternalLink, Uuid>,
    by_token: HashMap<String, Uuid>,
}

impl AccountTable {
    fn get(&self, id: &Uuid) -> Result<&Account, OAuthError> {
        self.accounts
            .get(id)
            .ok_or_else(|| OAuthError::ServerError(format!("unknown account {id}")))
    }

    fn get_mut(&mut self, id: &Uuid) -> Result<&mut Account, OAuthError> {
        self.accounts
            .get_mut(id)
            .ok_or_else(|| OAuthError::ServerError(format!("unknown account {id}")))
    }

    fn insert(
        &mut self,
        identifier: String,
        password_hash: Option<String>,
        external: Option<ExternalLink>,
    ) -> Result<Account, OAuthError> {
        if self.by_identifier.contains_key(&identifier) {
            return Err(OAuthError::AccountConflict);
        }
        if let Some(link) = &external {
            if self.by_link.contains_key(link) {
                return Err(OAuthError::AccountConflict);
            }
        }

        let token = generate_token()?;
        let account = Account {
            id: Uuid::new_v4(),
            identifier,
            external,
            token: Some(token.clone()),
            password_hash,
            created_at: Utc::now(),
        };
        self.by_identifier.insert(account.identifier.clone(), account.id);
        if let Some(link) = &account.external {
            self.by_link.insert(link.clone(), account.id);
        }
        self.by_token.insert(token, account.id);
        self.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    fn link(&mut self, id: Uuid, link: ExternalLink) -> Result<Account, OAuthError> {
        if let Some(owner) = self.by_link.get(&link) {
            return if *owner == id {
                Ok(self.get(&id)?.clone())
            } else {
                Err(OAuthError::AccountConflict)
            };
        }
        let account = self.get_mut(&id)?;
        if account.external.is_some() {
            return Err(OAuthError::AccountConflict);
        }
        account.external = Some(link.clone());
        let account = account.clone();
        self.by_link.insert(link, id);
        Ok(account)
    }

    fn ensure_token(&mut self, id: Uuid) -> Result<String, OAuthError> {
        if let Some(token) = &self.get(&id)?.token {
            return Ok(token.clone());
        }
        let token = generate_token()?;
        self.get_mut(&id)?.token = Some(token.clone());
        self.by_token.insert(token.clone(), id);
        Ok(token)
    }

    fn rotate(&mut self, id: Uuid, current: &str) -> Result<Option<String>, OAuthError> {
        let account = self.get_mut(&id)?;
        if account.token.as_deref() != Some(current) {
            return Ok(None);
        }
        let token = generate_token()?;
        account.token = Some(token.clone());
        self.by_token.remove(current);
        self.by_token.insert(token.clone(), id);
        Ok(Some(token))
    }
}

/// Account store backed by process memory.
///
/// Every read-modify-write runs under a single write guard, which gives the
/// per-account atomicity linking and rotation need.
#[derive(Clone, Default)]
pub struct InMemoryAccountStore {
    table: Arc<RwLock<AccountTable>>,
}

impl InMemoryAccountStore {
    /// Creates an empty in-memory account store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of accounts currently stored.
    pub async fn len(&self) -> usize {
        self.table.read().await.accounts.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Snapshot of every stored account.
    pub async fn accounts(&self) -> Vec<Account> {
        self.table.read().await.accounts.values().cloned().collect()
    }

    /// Fetch an account by primary key.
    pub async fn get(&self, id: Uuid) -> Option<Account> {
        self.table.read().await.accounts.get(&id).cloned()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Account>, OAuthError> {
        let key = normalize_identifier(identifier);
        let table = self.table.read().await;
        Ok(table
            .by_identifier
            .get(&key)
            .and_then(|id| table.accounts.get(id))
            .cloned())
    }

    async fn find_by_uid(&self, link: &ExternalLink) -> Result<Option<Account>, OAuthError> {
        let table = self.table.read().await;
        Ok(table.by_link.get(link).and_then(|id| table.accounts.get(id)).cloned())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Account>, OAuthError> {
        let table = self.table.read().await;
        Ok(table.by_token.get(token).and_then(|id| table.accounts.get(id)).cloned())
    }

    async fn verify_password(&self, account_id: Uuid, password: &str) -> Result<bool, OAuthError> {
        let hash = {
            let table = self.table.read().await;
            table.get(&account_id)?.password_hash.clone()
        };
        // accounts without a password still pay for a check
        let has_password = hash.is_some();
        let encoded = hash.unwrap_or_else(|| DUMMY_PASSWORD_HASH.to_string());
        let matched = verify_password_blocking(password.to_string(), encoded).await?;
        Ok(has_password && matched)
    }

    async fn create_account(
        &self,
        identifier: &str,
        password: Option<&str>,
        external: Option<ExternalLink>,
    ) -> Result<Account, OAuthError> {
        let password_hash = match password {
            Some(password) => Some(hash_password_blocking(password.to_string()).await?),
            None => None,
        };
        let mut table = self.table.write().await;
        let account = table.insert(normalize_identifier(identifier), password_hash, external)?;
        debug!(account_id = %account.id, "account created");
        Ok(account)
    }

    async fn link_uid(&self, account_id: Uuid, link: ExternalLink) -> Result<Account, OAuthError> {
        let mut table = self.table.write().await;
        table.link(account_id, link)
    }

    async fn issue_token(&self, account_id: Uuid) -> Result<String, OAuthError> {
        let mut table = self.table.write().await;
        table.ensure_token(account_id)
    }

    async fn rotate_token(
        &self,
        account_id: Uuid,
        current: &str,
    ) -> Result<Option<String>, OAuthError> {
        let mut table = self.table.write().await;
        table.rotate(account_id, current)
    }

    async fn upsert_external(
        &self,
        identity: &ExternalIdentity,
    ) -> Result<ExternalResolution, OAuthError> {
        let link = identity.link();
        let email = normalize_identifier(&identity.email);
        let mut table = self.table.write().await;

        if let Some(id) = table.by_link.get(&link).copied() {
            table.ensure_token(id)?;
            return Ok(ExternalResolution::Authenticated(table.get(&id)?.clone()));
        }

        if let Some(id) = table.by_identifier.get(&email).copied() {
            table.link(id, link)?;
            table.ensure_token(id)?;
            debug!(account_id = %id, provider = %identity.provider, "account linked");
            return Ok(ExternalResolution::Linked(table.get(&id)?.clone()));
        }

        let account = table.insert(email, None, Some(link))?;
        debug!(account_id = %account.id, provider = %identity.provider, "account provisioned");
        Ok(ExternalResolution::Provisioned(account))
    }
}
