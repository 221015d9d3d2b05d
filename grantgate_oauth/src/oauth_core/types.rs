//! OAuth2 core primitives: accounts, grants, tokens and errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// External identity providers an account can be linked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Facebook,
    Google,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Facebook => "facebook",
            Provider::Google => "google",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Association between an account and a provider-side user id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalLink {
    pub provider: Provider,
    pub uid: String,
}

/// An end-user identity owned by the account store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Store-assigned primary key.
    pub id: Uuid,
    /// Unique login identifier, usually an email address.
    pub identifier: String,
    /// Linked external identity, if any.
    pub external: Option<ExternalLink>,
    /// Current opaque bearer token. `None` until one is issued.
    pub token: Option<String>,
    /// Password hash; accounts provisioned through a provider have none.
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// External uid of the linked provider account, if any.
    pub fn uid(&self) -> Option<&str> {
        self.external.as_ref().map(|link| link.uid.as_str())
    }
}

/// Grant types understood by the token endpoint.
///
/// Unknown values are kept in [`GrantType::Unsupported`] so callers can match
/// the rejection path explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantType {
    Password,
    FacebookAuthCode,
    GoogleAuthCode,
    Unsupported(String),
}

impl GrantType {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "password" => GrantType::Password,
            "facebook_auth_code" => GrantType::FacebookAuthCode,
            "google_auth_code" => GrantType::GoogleAuthCode,
            other => GrantType::Unsupported(other.to_string()),
        }
    }

    /// Provider whose auth code this grant carries.
    pub fn provider(&self) -> Option<Provider> {
        match self {
            GrantType::FacebookAuthCode => Some(Provider::Facebook),
            GrantType::GoogleAuthCode => Some(Provider::Google),
            GrantType::Password | GrantType::Unsupported(_) => None,
        }
    }
}

/// A request against the token endpoint.
#[derive(Debug, Clone)]
pub struct GrantRequest {
    pub grant_type: GrantType,
    /// Resource owner identifier (password grant).
    pub username: Option<String>,
    /// Resource owner password (password grant).
    pub password: Option<String>,
    /// Provider authorization code (social grants).
    pub auth_code: Option<String>,
}

impl GrantRequest {
    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
        GrantRequest {
            grant_type: GrantType::Password,
            username: Some(username.into()),
            password: Some(password.into()),
            auth_code: None,
        }
    }

    pub fn auth_code(grant_type: GrantType, auth_code: Option<String>) -> Self {
        GrantRequest {
            grant_type,
            username: None,
            password: None,
            auth_code,
        }
    }
}

/// Identity returned by a successful provider exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    pub provider: Provider,
    pub uid: String,
    /// Verified email, normalized to trimmed lowercase.
    pub email: String,
}

impl ExternalIdentity {
    pub fn new(provider: Provider, uid: impl Into<String>, email: &str) -> Self {
        ExternalIdentity {
            provider,
            uid: uid.into(),
            email: normalize_identifier(email),
        }
    }

    pub fn link(&self) -> ExternalLink {
        ExternalLink {
            provider: self.provider,
            uid: self.uid.clone(),
        }
    }
}

/// A request against the revocation endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenRevocationRequest {
    pub token_type_hint: Option<String>,
    pub token: Option<String>,
}

/// Body of a successful token response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
}

/// Canonical form of an account identifier.
pub fn normalize_identifier(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Core OAuth2 error kinds.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OAuthError {
    /// Bad resource owner credentials.
    #[error("invalid grant")]
    InvalidGrant,
    /// A social grant arrived without an auth code.
    #[error("no authorization code supplied")]
    NoAuthorizationCode,
    /// The grant type is unknown or not enabled.
    #[error("unsupported grant type")]
    UnsupportedGrantType,
    /// The upstream identity provider failed or timed out.
    #[error("identity provider error: {0}")]
    ProviderError(String),
    /// A uniqueness constraint in the account store was violated.
    #[error("account conflict")]
    AccountConflict,
    /// Generic server-side error.
    #[error("server error: {0}")]
    ServerError(String),
}

impl OAuthError {
    /// HTTP status this error is reported with.
    pub fn status_code(&self) -> u16 {
        match self {
            OAuthError::InvalidGrant
            | OAuthError::NoAuthorizationCode
            | OAuthError::UnsupportedGrantType
            | OAuthError::AccountConflict => 400,
            OAuthError::ProviderError(_) => 502,
            OAuthError::ServerError(_) => 500,
        }
    }

    /// Wire error code, or `None` when the response carries no body.
    ///
    /// Provider failures are answered with an empty body so upstream payloads
    /// never reach the client.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            OAuthError::InvalidGrant | OAuthError::AccountConflict => Some("invalid_grant"),
            OAuthError::NoAuthorizationCode => Some("no_authorization_code"),
            OAuthError::UnsupportedGrantType => Some("unsupported_grant_type"),
            OAuthError::ProviderError(_) => None,
            OAuthError::ServerError(_) => Some("server_error"),
        }
    }
}
