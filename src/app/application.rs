use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use grantgate_oauth::{
    AccountStore, FacebookProvider, GoogleProvider, GrantResolver, InMemoryAccountStore, OAuthError,
    ReqwestHttpClient, RevocationHandler,
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::urls;
use crate::config::{SeedAccount, Settings};

/// RunMode enum to represent the mode of the application
/// Production: terse logs at `info`.
/// Development: verbose logs at `debug`, may include account ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    #[default]
    Production,
    Development,
}

/// State shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub resolver: GrantResolver,
    pub revocation: RevocationHandler,
}

impl AppState {
    /// Resolver and revocation handler over the same account store.
    pub fn new(resolver: GrantResolver) -> Self {
        let revocation = RevocationHandler::new(resolver.store().clone());
        AppState { resolver, revocation }
    }
}

pub struct App {
    pub state: AppState,
    pub binding: String,
    pub mode: RunMode,
}

impl App {
    pub fn new(state: AppState) -> Self {
        App { state, binding: "127.0.0.1:3000".to_string(), mode: RunMode::Production }
    }

    pub fn set_binding(&mut self, binding: impl Into<String>) {
        self.binding = binding.into();
    }

    pub fn set_mode(&mut self, mode: RunMode) {
        self.mode = mode;
    }

    /// Wire the in-memory store, seed accounts and enable the configured
    /// providers.
    pub async fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let store = InMemoryAccountStore::new();
        seed_accounts(&store, &settings.accounts).await?;

        let http = ReqwestHttpClient::new(settings.provider_timeout())
            .map_err(|e| anyhow::anyhow!("could not build HTTP client: {e}"))?;
        let mut resolver =
            GrantResolver::new(Arc::new(store)).provider_timeout(settings.provider_timeout());
        if let Some(config) = settings.facebook_config() {
            info!("facebook_auth_code grant enabled");
            let facebook = FacebookProvider::new(config, http.clone());
            resolver = resolver.with_provider(Arc::new(facebook));
        }
        if let Some(config) = settings.google_config() {
            info!("google_auth_code grant enabled");
            resolver = resolver.with_provider(Arc::new(GoogleProvider::new(config, http)));
        }

        let mut app = App::new(AppState::new(resolver));
        app.set_binding(settings.bind.clone());
        app.set_mode(settings.mode);
        Ok(app)
    }

    pub fn router(&self) -> Router {
        urls::routes(self.state.clone())
    }

    /// Serve until ctrl-c.
    pub async fn run(self) -> anyhow::Result<()> {
        let addr: SocketAddr = self.binding.parse()?;
        let listener = TcpListener::bind(addr).await?;
        info!(%addr, mode = ?self.mode, "listening");
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        info!("server stopped");
        Ok(())
    }
}

async fn seed_accounts(
    store: &InMemoryAccountStore,
    accounts: &[SeedAccount],
) -> anyhow::Result<()> {
    for seed in accounts {
        match store.create_account(&seed.identifier, Some(&seed.password), None).await {
            Ok(account) => info!(account_id = %account.id, "seeded account"),
            Err(OAuthError::AccountConflict) => {
                warn!(identifier = %seed.identifier, "duplicate seed account skipped")
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SeedAccount;

    #[tokio::test]
    async fn from_settings_seeds_accounts_and_keeps_binding() {
        let settings = Settings {
            bind: "127.0.0.1:0".to_string(),
            accounts: vec![
                SeedAccount { identifier: "admin@example.com".into(), password: "changeme".into() },
                SeedAccount { identifier: "ADMIN@example.com".into(), password: "other".into() },
            ],
            ..Settings::default()
        };
        let app = App::from_settings(&settings).await.unwrap();
        assert_eq!(app.binding, "127.0.0.1:0");

        let store = app.state.resolver.store();
        let admin = store.find_by_identifier("admin@example.com").await.unwrap().unwrap();
        assert!(store.verify_password(admin.id, "changeme").await.unwrap());
    }
}
