use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use super::crypto::{DUMMY_PASSWORD_HASH, verify_password_blocking};
use super::oauth_provider::{AccountStore, ExternalResolution};
use super::types::{Account, GrantRequest, GrantType, OAuthError, Provider, TokenResponse};
use crate::social::IdentityProvider;
use crate::social::provider::DEFAULT_PROVIDER_TIMEOUT;

/// Resolves token endpoint grants to a bearer token.
///
/// Password grants authenticate against the account store; auth-code grants
/// are exchanged with the matching identity provider and then resolved to an
/// account by link, by identifier, or by provisioning a new one. Tokens are
/// never rotated here.
#[derive(Clone)]
pub struct GrantResolver {
    store: Arc<dyn AccountStore>,
    providers: HashMap<Provider, Arc<dyn IdentityProvider>>,
    provider_timeout: Duration,
}

impl GrantResolver {
    /// Creates a resolver with no identity providers enabled.
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        GrantResolver {
            store,
            providers: HashMap::new(),
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    /// Enables the auth-code grant of `provider`'s kind.
    pub fn with_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.providers.insert(provider.provider(), provider);
        self
    }

    /// Bounds a whole provider exchange.
    pub fn provider_timeout(mut self, limit: Duration) -> Self {
        self.provider_timeout = limit;
        self
    }

    pub fn store(&self) -> &Arc<dyn AccountStore> {
        &self.store
    }

    #[instrument(skip_all, fields(grant_type = ?request.grant_type))]
    pub async fn resolve(&self, request: GrantRequest) -> Result<TokenResponse, OAuthError> {
        let access_token = match request.grant_type {
            GrantType::Password => {
                self.password_grant(request.username, request.password).await?
            }
            GrantType::FacebookAuthCode => {
                self.auth_code_grant(Provider::Facebook, request.auth_code).await?
            }
            GrantType::GoogleAuthCode => {
                self.auth_code_grant(Provider::Google, request.auth_code).await?
            }
            GrantType::Unsupported(_) => return Err(OAuthError::UnsupportedGrantType),
        };
        Ok(TokenResponse { access_token })
    }

    async fn password_grant(
        &self,
        username: Option<String>,
        password: Option<String>,
    ) -> Result<String, OAuthError> {
        let (Some(username), Some(password)) = (username, password) else {
            debug!("password grant without credentials");
            return Err(OAuthError::InvalidGrant);
        };
        let Some(account) = self.store.find_by_identifier(&username).await? else {
            // same hashing cost as a wrong password
            verify_password_blocking(password, DUMMY_PASSWORD_HASH.to_string()).await?;
            debug!("password grant for unknown identifier");
            return Err(OAuthError::InvalidGrant);
        };
        if !self.store.verify_password(account.id, &password).await? {
            debug!(account_id = %account.id, "password grant with bad password");
            return Err(OAuthError::InvalidGrant);
        }
        self.current_token(&account).await
    }

    async fn auth_code_grant(
        &self,
        provider: Provider,
        auth_code: Option<String>,
    ) -> Result<String, OAuthError> {
        let Some(identity_provider) = self.providers.get(&provider) else {
            debug!(%provider, "provider is not enabled");
            return Err(OAuthError::UnsupportedGrantType);
        };
        let auth_code = auth_code
            .filter(|code| !code.trim().is_empty())
            .ok_or(OAuthError::NoAuthorizationCode)?;

        let exchange = identity_provider.verify(&auth_code);
        let identity = match timeout(self.provider_timeout, exchange).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(%provider, timeout = ?self.provider_timeout, "provider exchange timed out");
                return Err(OAuthError::ProviderError(format!("{provider} exchange timed out")));
            }
        };

        let resolution = match self.store.upsert_external(&identity).await {
            Ok(resolution) => resolution,
            Err(OAuthError::AccountConflict) => {
                warn!(%provider, "identifier already linked to another external identity");
                return Err(OAuthError::InvalidGrant);
            }
            Err(e) => return Err(e),
        };
        match &resolution {
            ExternalResolution::Authenticated(account) => {
                debug!(account_id = %account.id, %provider, "social login")
            }
            ExternalResolution::Linked(account) => {
                info!(account_id = %account.id, %provider, "linked existing account")
            }
            ExternalResolution::Provisioned(account) => {
                info!(account_id = %account.id, %provider, "provisioned account")
            }
        }
        self.current_token(resolution.account()).await
    }

    async fn current_token(&self, account: &Account) -> Result<String, OAuthError> {
        match &account.token {
            Some(token) => Ok(token.clone()),
            None => self.store.issue_token(account.id).await,
        }
    }
}
