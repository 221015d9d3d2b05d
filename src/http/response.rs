use axum::Json;
use axum::http::StatusCode;
use axum::http::header::{CACHE_CONTROL, PRAGMA};
use axum::response::{IntoResponse, Response};
use grantgate_oauth::{OAuthError, TokenResponse};
use serde_json::json;
use tracing::warn;

/// Successful token endpoint reply. Token responses must never be cached.
pub struct TokenReply(pub TokenResponse);

impl IntoResponse for TokenReply {
    fn into_response(self) -> Response {
        (
            StatusCode::OK,
            [(CACHE_CONTROL, "no-store"), (PRAGMA, "no-cache")],
            Json(self.0),
        )
            .into_response()
    }
}

/// Token endpoint failure rendered as an HTTP response.
#[derive(Debug)]
pub struct TokenError(pub OAuthError);

impl From<OAuthError> for TokenError {
    fn from(err: OAuthError) -> Self {
        TokenError(err)
    }
}

impl IntoResponse for TokenError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let code = self.0.error_code();
        // Structured log
        warn!(error = %self.0, error_code = ?code, http_status = %status, "OAuth error occurred");
        match code {
            Some(code) => {
                let body = Json(json!({ "error": code }));
                (status, [(CACHE_CONTROL, "no-store")], body).into_response()
            }
            // upstream failures carry no body at all
            None => status.into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_has_empty_body_and_502() {
        let response = TokenError(OAuthError::ProviderError("boom".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(response.headers().get(axum::http::header::CONTENT_TYPE).is_none());
    }

    #[test]
    fn token_reply_disables_caching() {
        let response = TokenReply(TokenResponse { access_token: "abc".into() }).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CACHE_CONTROL], "no-store");
        assert_eq!(response.headers()[PRAGMA], "no-cache");
    }
}
