//! Authentication integration tests.
//!
//! Tests verify:
//! - Valid bearer tokens reach the remover
//! - Expired tokens are rejected with "Token expired"
//! - Tokens with a bad signature or shape are rejected with "Invalid token"
//! - Missing credentials never reach the remover

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, StatusCode};
use axum::response::Response;
use http_body_util::BodyExt;
use tower::ServiceExt;

use bg_remover::{create_router, Claims, JwtVerifier, RouterConfig, TokenSigner};

use super::test_utils::{
    counting_router, create_subject_png, expired_token, remove_bg_request, valid_token,
    CountingRemover, TEST_SECRET,
};

async fn detail(response: Response) -> String {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
    error["detail"].as_str().unwrap().to_string()
}

fn assert_bearer_challenge(response: &Response) {
    assert_eq!(
        response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
        "Bearer"
    );
}

// =============================================================================
// Valid Tokens
// =============================================================================

#[tokio::test]
async fn test_valid_token_succeeds() {
    let (router, remover) = counting_router();

    let response = router
        .oneshot(remove_bg_request(
            Some(&valid_token()),
            "file",
            &create_subject_png(8),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(remover.calls(), 1);
}

#[tokio::test]
async fn test_token_without_expiry_succeeds() {
    let (router, remover) = counting_router();

    // the account backend issues `{id, iat}` tokens with no exp
    let claims = Claims::default().with_claim("id", "65f0c0ffee");
    let token = TokenSigner::new_hs256(TEST_SECRET).sign(&claims).unwrap();

    let response = router
        .oneshot(remove_bg_request(Some(&token), "file", &create_subject_png(8)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(remover.calls(), 1);
}

#[tokio::test]
async fn test_lowercase_bearer_scheme_accepted() {
    let (router, _remover) = counting_router();

    let mut request = remove_bg_request(None, "file", &create_subject_png(8));
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("bearer {}", valid_token()).parse().unwrap(),
    );

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Expired Tokens
// =============================================================================

#[tokio::test]
async fn test_expired_token_rejected() {
    let (router, remover) = counting_router();
    let token = expired_token(TEST_SECRET, 100);

    let response = router
        .oneshot(remove_bg_request(Some(&token), "file", &create_subject_png(8)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_bearer_challenge(&response);
    assert_eq!(detail(response).await, "Token expired");
    assert_eq!(remover.calls(), 0);
}

#[tokio::test]
async fn test_expired_token_wins_over_bad_signature() {
    let (router, _remover) = counting_router();
    let token = expired_token("some-other-secret", 100);

    let response = router
        .oneshot(remove_bg_request(Some(&token), "file", &create_subject_png(8)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(detail(response).await, "Token expired");
}

#[tokio::test]
async fn test_leeway_admits_recently_expired_token() {
    let remover = CountingRemover::new();
    let router = create_router(
        Arc::new(remover.clone()),
        JwtVerifier::new(TEST_SECRET, jsonwebtoken::Algorithm::HS256, 300).unwrap(),
        RouterConfig::new().with_tracing(false),
    );
    let token = expired_token(TEST_SECRET, 10);

    let response = router
        .oneshot(remove_bg_request(Some(&token), "file", &create_subject_png(8)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(remover.calls(), 1);
}

// =============================================================================
// Invalid Tokens
// =============================================================================

#[tokio::test]
async fn test_wrong_secret_rejected() {
    let (router, remover) = counting_router();
    let token = TokenSigner::new_hs256("wrong-secret")
        .sign_with_ttl(Claims::with_subject("user-1"), Some(Duration::from_secs(3600)))
        .unwrap();

    let response = router
        .oneshot(remove_bg_request(Some(&token), "file", &create_subject_png(8)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_bearer_challenge(&response);
    assert_eq!(detail(response).await, "Invalid token");
    assert_eq!(remover.calls(), 0);
}

#[tokio::test]
async fn test_malformed_token_rejected() {
    let (router, remover) = counting_router();

    let response = router
        .oneshot(remove_bg_request(
            Some("not.a.jwt"),
            "file",
            &create_subject_png(8),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(detail(response).await, "Invalid token");
    assert_eq!(remover.calls(), 0);
}

#[tokio::test]
async fn test_other_algorithm_rejected() {
    let (router, _remover) = counting_router();
    let token = TokenSigner::new(TEST_SECRET, jsonwebtoken::Algorithm::HS512)
        .unwrap()
        .sign(&Claims::with_subject("user-1"))
        .unwrap();

    let response = router
        .oneshot(remove_bg_request(Some(&token), "file", &create_subject_png(8)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(detail(response).await, "Invalid token");
}

#[tokio::test]
async fn test_not_yet_valid_token_rejected() {
    let (router, remover) = counting_router();
    let now = bg_remover::server::auth::unix_now();
    let claims = Claims::with_subject("user-1").with_claim("nbf", now + 3600);
    let token = TokenSigner::new_hs256(TEST_SECRET).sign(&claims).unwrap();

    let response = router
        .oneshot(remove_bg_request(Some(&token), "file", &create_subject_png(8)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(detail(response).await, "Invalid token");
    assert_eq!(remover.calls(), 0);
}

#[tokio::test]
async fn test_token_with_audience_rejected() {
    let (router, remover) = counting_router();
    let claims = Claims::with_subject("user-1").with_claim("aud", "some-other-service");
    let token = TokenSigner::new_hs256(TEST_SECRET).sign(&claims).unwrap();

    let response = router
        .oneshot(remove_bg_request(Some(&token), "file", &create_subject_png(8)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(detail(response).await, "Invalid token");
    assert_eq!(remover.calls(), 0);
}

// =============================================================================
// Missing Credentials
// =============================================================================

#[tokio::test]
async fn test_missing_authorization_rejected() {
    let (router, remover) = counting_router();

    let response = router
        .oneshot(remove_bg_request(None, "file", &create_subject_png(8)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_bearer_challenge(&response);
    assert_eq!(detail(response).await, "Not authenticated");
    assert_eq!(remover.calls(), 0);
}

#[tokio::test]
async fn test_non_bearer_scheme_rejected() {
    let (router, remover) = counting_router();

    let mut request = remove_bg_request(None, "file", &create_subject_png(8));
    request.headers_mut().insert(
        header::AUTHORIZATION,
        "Basic dXNlcjpwYXNz".parse().unwrap(),
    );

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(detail(response).await, "Not authenticated");
    assert_eq!(remover.calls(), 0);
}

#[tokio::test]
async fn test_auth_checked_before_body() {
    let (router, remover) = counting_router();

    // an unparseable body must still yield 401 when the token is missing
    let mut request = remove_bg_request(None, "file", b"");
    request.headers_mut().insert(
        header::CONTENT_TYPE,
        "text/plain".parse().unwrap(),
    );

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(remover.calls(), 0);
}
