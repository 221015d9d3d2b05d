//! Settings loaded from an optional TOML file and `GRANTGATE__*` environment
//! variables (e.g. `GRANTGATE__BIND`, `GRANTGATE__GOOGLE__CLIENT_SECRET`).

use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use grantgate_oauth::social::facebook::{FACEBOOK_PROFILE_URL, FACEBOOK_TOKEN_URL};
use grantgate_oauth::social::google::{GOOGLE_PROFILE_URL, GOOGLE_TOKEN_URL};
use grantgate_oauth::ProviderConfig;
use serde::Deserialize;

use crate::app::application::RunMode;

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "grantgate";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Socket address the server listens on.
    pub bind: String,
    pub mode: RunMode,
    /// Upper bound on a whole provider exchange, in seconds.
    pub provider_timeout_secs: u64,
    pub facebook: Option<ProviderSettings>,
    pub google: Option<ProviderSettings>,
    /// Password accounts created at startup.
    pub accounts: Vec<SeedAccount>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            bind: "127.0.0.1:3000".to_string(),
            mode: RunMode::Production,
            provider_timeout_secs: 10,
            facebook: None,
            google: None,
            accounts: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub token_url: Option<String>,
    pub profile_url: Option<String>,
}

impl ProviderSettings {
    fn into_config(self, token_url: &str, profile_url: &str, timeout: Duration) -> ProviderConfig {
        ProviderConfig::new(
            self.client_id,
            self.client_secret,
            self.redirect_uri,
            self.token_url.unwrap_or_else(|| token_url.to_string()),
            self.profile_url.unwrap_or_else(|| profile_url.to_string()),
        )
        .timeout(timeout)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedAccount {
    pub identifier: String,
    pub password: String,
}

impl Settings {
    /// Load settings from `path` (required when given, otherwise
    /// `grantgate.toml` if present) with environment overrides on top.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };
        Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix("GRANTGATE").separator("__").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    /// Facebook adapter config, if the provider is enabled.
    pub fn facebook_config(&self) -> Option<ProviderConfig> {
        let timeout = self.provider_timeout();
        self.facebook
            .clone()
            .map(|s| s.into_config(FACEBOOK_TOKEN_URL, FACEBOOK_PROFILE_URL, timeout))
    }

    /// Google adapter config, if the provider is enabled.
    pub fn google_config(&self) -> Option<ProviderConfig> {
        let timeout = self.provider_timeout();
        self.google
            .clone()
            .map(|s| s.into_config(GOOGLE_TOKEN_URL, GOOGLE_PROFILE_URL, timeout))
    }
}
