pub mod provider;
pub mod facebook;
pub mod google;

pub use facebook::FacebookProvider;
pub use google::GoogleProvider;
pub use provider::{IdentityProvider, ProviderConfig};
