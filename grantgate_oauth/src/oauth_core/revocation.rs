use std::sync::Arc;

use tracing::{debug, instrument, warn};

use super::oauth_provider::AccountStore;
use super::types::TokenRevocationRequest;

/// Token revocation (RFC 7009 style).
///
/// Revoking rotates the holder's token. Unknown tokens and store failures are
/// silent no-ops: the caller can never tell them apart from a successful
/// revocation.
#[derive(Clone)]
pub struct RevocationHandler {
    store: Arc<dyn AccountStore>,
}

impl RevocationHandler {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        RevocationHandler { store }
    }

    #[instrument(skip_all, fields(token_type_hint = request.token_type_hint.as_deref()))]
    pub async fn revoke(&self, request: TokenRevocationRequest) {
        let Some(token) = request.token.filter(|token| !token.is_empty()) else {
            debug!("revocation without token");
            return;
        };
        let account = match self.store.find_by_token(&token).await {
            Ok(Some(account)) => account,
            Ok(None) => {
                debug!("revocation for unknown token");
                return;
            }
            Err(e) => {
                warn!(error = %e, "token lookup failed during revocation");
                return;
            }
        };
        match self.store.rotate_token(account.id, &token).await {
            Ok(Some(_)) => debug!(account_id = %account.id, "token rotated"),
            // someone else rotated it first; the old token is dead either way
            Ok(None) => debug!(account_id = %account.id, "token already rotated"),
            Err(e) => warn!(account_id = %account.id, error = %e, "token rotation failed"),
        }
    }
}
