pub mod types;
pub mod oauth_provider;
pub mod memory;
pub mod crypto;
pub mod http_client;
pub mod grant_resolver;
pub mod revocation;
