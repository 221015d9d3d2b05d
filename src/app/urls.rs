use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Form, Router};
use grantgate_oauth::TokenRevocationRequest;

use super::application::AppState;
use crate::http::request::TokenParams;
use crate::http::response::{TokenError, TokenReply};
use crate::logging::print_log;

/// Route table of the token service.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/token", post(token))
        .route("/revoke", post(revoke))
        .layer(middleware::from_fn(print_log))
        .with_state(state)
}

/// `POST /token`: resolve a grant to a bearer token.
///
/// A body that cannot be read as a form is treated like an empty form, which
/// resolves to `unsupported_grant_type`.
async fn token(
    State(state): State<AppState>,
    params: Option<Form<TokenParams>>,
) -> Result<TokenReply, TokenError> {
    let params = params.map(|Form(params)| params).unwrap_or_default();
    let reply = state.resolver.resolve(params.into()).await?;
    Ok(TokenReply(reply))
}

/// `POST /revoke`: always answers 200 with an empty body.
async fn revoke(
    State(state): State<AppState>,
    params: Option<Form<TokenRevocationRequest>>,
) -> impl IntoResponse {
    let request = params.map(|Form(request)| request).unwrap_or_default();
    state.revocation.revoke(request).await;
    StatusCode::OK
}
