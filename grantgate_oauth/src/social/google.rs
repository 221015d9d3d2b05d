//! "Login with Google" via the OAuth2 token and userinfo endpoints.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;

use super::provider::{
    AccessTokenResponse, IdentityProvider, ProviderConfig, endpoint_with_params, fetch_json,
};
use crate::oauth_core::http_client::{HttpRequest, OAuthHttpClient};
use crate::oauth_core::types::{ExternalIdentity, OAuthError, Provider};

pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_PROFILE_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

#[derive(Debug, Deserialize)]
struct GoogleProfile {
    sub: String,
    email: Option<String>,
    email_verified: Option<bool>,
}

/// Google adapter: POST code to the token endpoint, then read `{sub, email}`
/// from userinfo.
#[derive(Clone)]
pub struct GoogleProvider<C: OAuthHttpClient> {
    config: ProviderConfig,
    http: C,
}

impl<C: OAuthHttpClient> GoogleProvider<C> {
    pub fn new(config: ProviderConfig, http: C) -> Self {
        GoogleProvider { config, http }
    }

    /// Config pointing at Google's public endpoints.
    pub fn default_config(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> ProviderConfig {
        ProviderConfig::new(
            client_id,
            client_secret,
            redirect_uri,
            GOOGLE_TOKEN_URL,
            GOOGLE_PROFILE_URL,
        )
    }

    async fn exchange_code(&self, auth_code: &str) -> Result<String, OAuthError> {
        let request = HttpRequest::post_form(
            self.config.token_url.clone(),
            &[
                ("grant_type", "authorization_code"),
                ("code", auth_code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
            ],
        )
        .map_err(|e| {
            OAuthError::ServerError(format!("could not encode google token request: {e}"))
        })?
        .with_timeout(self.config.timeout);
        let token: AccessTokenResponse = fetch_json(Provider::Google, &self.http, request).await?;
        Ok(token.access_token)
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<GoogleProfile, OAuthError> {
        let params = [("access_token", access_token)];
        let url = endpoint_with_params(&self.config.profile_url, &params)?;
        let request = HttpRequest::get(url).with_timeout(self.config.timeout);
        fetch_json(Provider::Google, &self.http, request).await
    }
}

#[async_trait]
impl<C: OAuthHttpClient> IdentityProvider for GoogleProvider<C> {
    fn provider(&self) -> Provider {
        Provider::Google
    }

    #[instrument(skip_all, level = "debug")]
    async fn verify(&self, auth_code: &str) -> Result<ExternalIdentity, OAuthError> {
        let access_token = self.exchange_code(auth_code).await?;
        let profile = self.fetch_profile(&access_token).await?;
        if profile.email_verified == Some(false) {
            return Err(OAuthError::ProviderError("google email is not verified".into()));
        }
        let email = profile
            .email
            .filter(|email| !email.trim().is_empty())
            .ok_or_else(|| OAuthError::ProviderError("google profile has no email".into()))?;
        Ok(ExternalIdentity::new(Provider::Google, profile.sub, &email))
    }
}
