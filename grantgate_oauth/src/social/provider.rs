use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::oauth_core::http_client::{HttpRequest, OAuthHttpClient};
use crate::oauth_core::types::{ExternalIdentity, OAuthError, Provider};

/// Default bound on a single provider HTTP call.
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

/// Implement this to support "Login via X": exchange an auth code issued by
/// the provider for the identity it vouches for.
#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    /// Which provider this adapter talks to.
    fn provider(&self) -> Provider;

    /// Exchange `auth_code` for a verified external identity.
    ///
    /// Every failure (non-2xx status, transport error, timeout, unusable
    /// profile) is reported as [`OAuthError::ProviderError`].
    async fn verify(&self, auth_code: &str) -> Result<ExternalIdentity, OAuthError>;
}

/// Credentials and endpoints of one upstream provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Redirect URI the auth code was issued for.
    pub redirect_uri: String,
    /// Endpoint exchanging an auth code for an access token.
    pub token_url: String,
    /// Endpoint returning the user profile for an access token.
    pub profile_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl ProviderConfig {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
        token_url: impl Into<String>,
        profile_url: impl Into<String>,
    ) -> Self {
        ProviderConfig {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            token_url: token_url.into(),
            profile_url: profile_url.into(),
            timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    /// Overrides the token endpoint.
    pub fn token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Overrides the profile endpoint.
    pub fn profile_url(mut self, url: impl Into<String>) -> Self {
        self.profile_url = url.into();
        self
    }

    /// Overrides the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Access token part of a provider's code exchange response.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct AccessTokenResponse {
    pub access_token: String,
}

/// Append query parameters to a configured endpoint.
pub(crate) fn endpoint_with_params(
    base: &str,
    params: &[(&str, &str)],
) -> Result<String, OAuthError> {
    url::Url::parse_with_params(base, params)
        .map(String::from)
        .map_err(|e| OAuthError::ServerError(format!("invalid provider url {base}: {e}")))
}

/// Execute a provider call and decode its JSON body.
pub(crate) async fn fetch_json<C, T>(
    provider: Provider,
    client: &C,
    request: HttpRequest,
) -> Result<T, OAuthError>
where
    C: OAuthHttpClient,
    T: DeserializeOwned,
{
    let response = client.execute(request).await.map_err(|e| {
        warn!(%provider, error = %e, "provider request failed");
        OAuthError::ProviderError(format!("{provider} request failed"))
    })?;
    if !response.is_success() {
        warn!(%provider, status = response.status, "provider responded with an error");
        return Err(OAuthError::ProviderError(format!(
            "{provider} responded with status {}",
            response.status
        )));
    }
    serde_json::from_slice(&response.body).map_err(|e| {
        warn!(%provider, error = %e, "provider response could not be decoded");
        OAuthError::ProviderError(format!("{provider} sent an unexpected response"))
    })
}
