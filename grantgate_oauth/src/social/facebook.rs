//! "Login with Facebook" via the Graph API.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;

use super::provider::{
    AccessTokenResponse, IdentityProvider, ProviderConfig, endpoint_with_params, fetch_json,
};
use crate::oauth_core::http_client::{HttpRequest, OAuthHttpClient};
use crate::oauth_core::types::{ExternalIdentity, OAuthError, Provider};

pub const FACEBOOK_TOKEN_URL: &str = "https://graph.facebook.com/v19.0/oauth/access_token";
pub const FACEBOOK_PROFILE_URL: &str = "https://graph.facebook.com/me";

#[derive(Debug, Deserialize)]
struct FacebookProfile {
    id: String,
    email: Option<String>,
}

/// Facebook adapter: code → access token → `/me?fields=id,email`.
#[derive(Clone)]
pub struct FacebookProvider<C: OAuthHttpClient> {
    config: ProviderConfig,
    http: C,
}

impl<C: OAuthHttpClient> FacebookProvider<C> {
    pub fn new(config: ProviderConfig, http: C) -> Self {
        FacebookProvider { config, http }
    }

    /// Config pointing at the public Graph API endpoints.
    pub fn default_config(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> ProviderConfig {
        ProviderConfig::new(
            client_id,
            client_secret,
            redirect_uri,
            FACEBOOK_TOKEN_URL,
            FACEBOOK_PROFILE_URL,
        )
    }

    async fn exchange_code(&self, auth_code: &str) -> Result<String, OAuthError> {
        let url = endpoint_with_params(
            &self.config.token_url,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("code", auth_code),
            ],
        )?;
        let request = HttpRequest::get(url).with_timeout(self.config.timeout);
        let token: AccessTokenResponse = fetch_json(Provider::Facebook, &self.http, request).await?;
        Ok(token.access_token)
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<FacebookProfile, OAuthError> {
        let url = endpoint_with_params(
            &self.config.profile_url,
            &[("fields", "id,email"), ("access_token", access_token)],
        )?;
        let request = HttpRequest::get(url).with_timeout(self.config.timeout);
        fetch_json(Provider::Facebook, &self.http, request).await
    }
}

#[async_trait]
impl<C: OAuthHttpClient> IdentityProvider for FacebookProvider<C> {
    fn provider(&self) -> Provider {
        Provider::Facebook
    }

    #[instrument(skip_all, level = "debug")]
    async fn verify(&self, auth_code: &str) -> Result<ExternalIdentity, OAuthError> {
        let access_token = self.exchange_code(auth_code).await?;
        let profile = self.fetch_profile(&access_token).await?;
        let email = profile
            .email
            .filter(|email| !email.trim().is_empty())
            .ok_or_else(|| OAuthError::ProviderError("facebook profile has no email".into()))?;
        Ok(ExternalIdentity::new(Provider::Facebook, profile.id, &email))
    }
}
