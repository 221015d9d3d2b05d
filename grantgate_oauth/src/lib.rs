pub mod oauth_core;
pub mod social;

pub use oauth_core::grant_resolver::GrantResolver;
pub use oauth_core::revocation::RevocationHandler;
pub use oauth_core::memory::InMemoryAccountStore;
pub use oauth_core::oauth_provider::{AccountStore, ExternalResolution};
pub use oauth_core::http_client::{
    HttpClientError, HttpMethod, HttpRequest, HttpResponse, InMemoryHttpClient, OAuthHttpClient,
};
#[cfg(feature = "social")]
pub use oauth_core::http_client::ReqwestHttpClient;
pub use oauth_core::types::{
    Account, ExternalIdentity, ExternalLink, GrantRequest, GrantType, OAuthError, Provider,
    TokenResponse, TokenRevocationRequest,
};
pub use social::{FacebookProvider, GoogleProvider, IdentityProvider, ProviderConfig};
