use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use grantgate_oauth::{
    AccountStore, ExternalLink, FacebookProvider, GoogleProvider, GrantRequest, GrantResolver,
    GrantType,
    HttpResponse, InMemoryAccountStore, InMemoryHttpClient, OAuthError, Provider, ProviderConfig,
    RevocationHandler, TokenRevocationRequest,
};
use serde_json::json;

const FB_TOKEN_URL: &str = "https://graph.facebook.test/oauth/access_token";
const FB_PROFILE_URL: &str = "https://graph.facebook.test/me";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.google.test/token";
const GOOGLE_PROFILE_URL: &str = "https://www.google.test/oauth2/v3/userinfo";

/// Stubbed providers answering with the given profiles.
fn stubbed_http(
    facebook_profile: HttpResponse,
    google_profile: HttpResponse,
) -> InMemoryHttpClient {
    let http = InMemoryHttpClient::new();
    let token = HttpResponse::json(200, &json!({ "access_token": "access_token" }));
    http.insert_response(FB_TOKEN_URL, token.clone());
    http.insert_response(GOOGLE_TOKEN_URL, token);
    http.insert_response(FB_PROFILE_URL, facebook_profile);
    http.insert_response(GOOGLE_PROFILE_URL, google_profile);
    http
}

fn resolver(store: &InMemoryAccountStore, http: InMemoryHttpClient) -> GrantResolver {
    let callback = "https://app.test/cb";
    let facebook = ProviderConfig::new("fb", "fb-secret", callback, FB_TOKEN_URL, FB_PROFILE_URL);
    let google =
        ProviderConfig::new("g", "g-secret", callback, GOOGLE_TOKEN_URL, GOOGLE_PROFILE_URL);
    GrantResolver::new(Arc::new(store.clone()))
        .with_provider(Arc::new(FacebookProvider::new(facebook, http.clone())))
        .with_provider(Arc::new(GoogleProvider::new(google, http)))
}

fn facebook_profile(email: &str) -> HttpResponse {
    HttpResponse::json(200, &json!({ "id": "1238190321", "email": email }))
}

fn google_profile(email: &str) -> HttpResponse {
    HttpResponse::json(200, &json!({ "sub": "1238190321", "email": email }))
}

async fn store_with_login() -> (InMemoryAccountStore, grantgate_oauth::Account) {
    let store = InMemoryAccountStore::new();
    let login = store.create_account("login@example.com", Some("password"), None).await.unwrap();
    (store, login)
}

#[tokio::test]
async fn test_password_grant_returns_existing_token() {
    let (store, login) = store_with_login().await;
    let resolver = resolver(&store, InMemoryHttpClient::new());

    let response = resolver
        .resolve(GrantRequest::password("login@example.com", "password"))
        .await
        .unwrap();
    assert_eq!(Some(response.access_token.clone()), login.token);

    // No rotation on repeated logins
    let again = resolver
        .resolve(GrantRequest::password("login@example.com", "password"))
        .await
        .unwrap();
    assert_eq!(again, response);
}

#[tokio::test]
async fn test_password_grant_rejects_bad_credentials() {
    let (store, login) = store_with_login().await;
    let resolver = resolver(&store, InMemoryHttpClient::new());

    let err = resolver
        .resolve(GrantRequest::password("login@example.com", "badpassword"))
        .await
        .unwrap_err();
    assert_eq!(err, OAuthError::InvalidGrant);
    let err = resolver
        .resolve(GrantRequest::password("nobody@example.com", "password"))
        .await
        .unwrap_err();
    assert_eq!(err, OAuthError::InvalidGrant);
    let missing =
        GrantRequest { password: None, ..GrantRequest::password("login@example.com", "") };
    assert_eq!(resolver.resolve(missing).await.unwrap_err(), OAuthError::InvalidGrant);

    let unchanged = store.get(login.id).await.unwrap();
    assert_eq!(unchanged.token, login.token);
    assert!(unchanged.external.is_none());
}

#[tokio::test]
async fn test_facebook_grant_links_existing_login() {
    let (store, login) = store_with_login().await;
    let http = stubbed_http(facebook_profile("login@example.com"), HttpResponse::status(500));
    let resolver = resolver(&store, http);

    let request = GrantRequest::auth_code(GrantType::FacebookAuthCode, Some("authcode".into()));
    let response = resolver.resolve(request.clone()).await.unwrap();
    assert_eq!(Some(response.access_token.clone()), login.token);

    let linked = store.get(login.id).await.unwrap();
    assert_eq!(linked.uid(), Some("1238190321"));

    // Idempotent: same uid, same token, no new account
    let again = resolver.resolve(request).await.unwrap();
    assert_eq!(again, response);
    assert_eq!(store.get(login.id).await.unwrap().uid(), Some("1238190321"));
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_google_grant_provisions_new_login() {
    let (store, _) = store_with_login().await;
    let http = stubbed_http(HttpResponse::status(500), google_profile("new.user@example.com"));
    let resolver = resolver(&store, http);

    let request = GrantRequest::auth_code(GrantType::GoogleAuthCode, Some("authcode".into()));
    let response = resolver.resolve(request).await.unwrap();

    assert_eq!(store.len().await, 2);
    let created = store.find_by_identifier("new.user@example.com").await.unwrap().unwrap();
    assert_eq!(created.token, Some(response.access_token));
    assert_eq!(
        created.external,
        Some(ExternalLink { provider: Provider::Google, uid: "1238190321".into() })
    );
}

#[tokio::test]
async fn test_social_grant_without_code() {
    let (store, _) = store_with_login().await;
    let resolver = resolver(&store, InMemoryHttpClient::new());

    for grant_type in [GrantType::FacebookAuthCode, GrantType::GoogleAuthCode] {
        let request = GrantRequest::auth_code(grant_type.clone(), None);
        let err = resolver.resolve(request).await.unwrap_err();
        assert_eq!(err, OAuthError::NoAuthorizationCode);
        let request = GrantRequest::auth_code(grant_type, Some("  ".into()));
        let err = resolver.resolve(request).await.unwrap_err();
        assert_eq!(err, OAuthError::NoAuthorizationCode);
    }
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_provider_error_leaves_store_untouched() {
    let (store, login) = store_with_login().await;
    let http = stubbed_http(HttpResponse::status(422), HttpResponse::status(422));
    let resolver = resolver(&store, http);

    for grant_type in [GrantType::FacebookAuthCode, GrantType::GoogleAuthCode] {
        let err = resolver
            .resolve(GrantRequest::auth_code(grant_type, Some("authcode".into())))
            .await
            .unwrap_err();
        assert!(matches!(err, OAuthError::ProviderError(_)));
    }
    assert_eq!(store.len().await, 1);
    let unchanged = store.get(login.id).await.unwrap();
    assert!(unchanged.external.is_none());
    assert_eq!(unchanged.token, login.token);
}

#[tokio::test]
async fn test_conflicting_link_is_rejected() {
    let (store, login) = store_with_login().await;
    let other = ExternalLink { provider: Provider::Facebook, uid: "someone-else".into() };
    store.link_uid(login.id, other.clone()).await.unwrap();

    let http = stubbed_http(facebook_profile("login@example.com"), HttpResponse::status(500));
    let resolver = resolver(&store, http);
    let err = resolver
        .resolve(GrantRequest::auth_code(GrantType::FacebookAuthCode, Some("authcode".into())))
        .await
        .unwrap_err();
    assert_eq!(err, OAuthError::InvalidGrant);
    assert_eq!(store.get(login.id).await.unwrap().external, Some(other));
}

#[tokio::test]
async fn test_unknown_and_disabled_grant_types() {
    let store = InMemoryAccountStore::new();
    let resolver = resolver(&store, InMemoryHttpClient::new());
    let err = resolver
        .resolve(GrantRequest::auth_code(GrantType::parse("UNKNOWN"), None))
        .await
        .unwrap_err();
    assert_eq!(err, OAuthError::UnsupportedGrantType);

    // No providers configured at all
    let bare = GrantResolver::new(Arc::new(store.clone()));
    let err = bare
        .resolve(GrantRequest::auth_code(GrantType::GoogleAuthCode, Some("authcode".into())))
        .await
        .unwrap_err();
    assert_eq!(err, OAuthError::UnsupportedGrantType);
}

#[tokio::test]
async fn test_slow_provider_times_out() {
    let store = InMemoryAccountStore::new();
    let http = stubbed_http(facebook_profile("slow@example.com"), HttpResponse::status(500))
        .with_delay(Duration::from_secs(5));
    let resolver = resolver(&store, http).provider_timeout(Duration::from_millis(50));

    let err = resolver
        .resolve(GrantRequest::auth_code(GrantType::FacebookAuthCode, Some("authcode".into())))
        .await
        .unwrap_err();
    assert!(matches!(err, OAuthError::ProviderError(_)));
    assert!(store.is_empty().await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_logins_create_one_account() {
    let store = InMemoryAccountStore::new();
    let http = stubbed_http(HttpResponse::status(500), google_profile("race@example.com"));
    let resolver = resolver(&store, http);

    let attempts = (0..16).map(|_| {
        let resolver = resolver.clone();
        tokio::spawn(async move {
            let code = Some("authcode".to_string());
            let request = GrantRequest::auth_code(GrantType::GoogleAuthCode, code);
            resolver.resolve(request).await
        })
    });
    let tokens: Vec<String> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap().access_token)
        .collect();

    assert_eq!(store.len().await, 1);
    assert!(tokens.iter().all(|token| token == &tokens[0]));
}

#[tokio::test]
async fn test_revocation_rotates_token() {
    let (store, login) = store_with_login().await;
    let handler = RevocationHandler::new(Arc::new(store.clone()));
    let old = login.token.clone().unwrap();

    handler
        .revoke(TokenRevocationRequest {
            token_type_hint: Some("access_token".into()),
            token: Some(old.clone()),
        })
        .await;

    let rotated = store.get(login.id).await.unwrap().token.unwrap();
    assert_ne!(rotated, old);
    assert!(store.find_by_token(&old).await.unwrap().is_none());

    // The new token works for password logins again
    let resolver = resolver(&store, InMemoryHttpClient::new());
    let response = resolver
        .resolve(GrantRequest::password("login@example.com", "password"))
        .await
        .unwrap();
    assert_eq!(response.access_token, rotated);
}

#[tokio::test]
async fn test_revocation_of_unknown_token_changes_nothing() {
    let (store, login) = store_with_login().await;
    let handler = RevocationHandler::new(Arc::new(store.clone()));

    handler
        .revoke(TokenRevocationRequest {
            token_type_hint: Some("access_token".into()),
            token: Some("badtoken".into()),
        })
        .await;
    handler.revoke(TokenRevocationRequest::default()).await;

    assert_eq!(store.get(login.id).await.unwrap().token, login.token);
}
