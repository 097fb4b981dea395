//! End-to-end behaviour of the middleware chain, driven with `oneshot`.

use std::sync::Arc;

use axum::http::{header, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use common::{
    body_json, body_text, get_request, rate_limit, router, state, state_with, FailingDirectory,
    ACTIVE_NO_PERMS, ACTIVE_READER, INACTIVE_READER,
};

mod common;

const SERVER_ERROR: &str = "the server encountered a problem and could not process your request";
const INVALID_TOKEN: &str = "invalid or missing authentication token";

#[tokio::test]
async fn test_recover_panic() {
    let app = router(&state(rate_limit(false, 4)));

    let response = app.oneshot(get_request("/panic", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.headers().get(header::CONNECTION).unwrap(), "close");
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    assert_eq!(body_json(response).await, json!({ "error": SERVER_ERROR }));
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit() {
    let app = router(&state(rate_limit(true, 4)));

    for _ in 0..4 {
        let response = app.clone().oneshot(get_request("/v1/movies", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app.clone().oneshot(get_request("/v1/movies", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body_json(response).await, json!({ "error": "rate limit exceeded" }));
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_runs_before_authentication() {
    let app = router(&state(rate_limit(true, 1)));

    let response = app.clone().oneshot(get_request("/v1/movies", Some("wasd"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // The rejected request still consumed the only token.
    let response = app
        .clone()
        .oneshot(get_request("/v1/movies", Some(&format!("Bearer {ACTIVE_READER}"))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_authenticate() {
    let app = router(&state(rate_limit(false, 4)));

    let cases = [
        ("anonymous", None, StatusCode::OK),
        ("no prefix", Some("wasd".to_string()), StatusCode::UNAUTHORIZED),
        ("wrong scheme", Some(format!("Basic {ACTIVE_READER}")), StatusCode::UNAUTHORIZED),
        ("extra field", Some(format!("Bearer {ACTIVE_READER} x")), StatusCode::UNAUTHORIZED),
        ("malformed token", Some("Bearer wasd".to_string()), StatusCode::UNAUTHORIZED),
        ("unknown token", Some("Bearer AAAAAAAAAAAAAAAAAAAAAAAAAA".to_string()), StatusCode::UNAUTHORIZED),
        ("valid token", Some(format!("Bearer {ACTIVE_READER}")), StatusCode::OK),
    ];

    for (name, authorization, want) in cases {
        let response = app
            .clone()
            .oneshot(get_request("/v1/movies", authorization.as_deref()))
            .await
            .unwrap();
        assert_eq!(response.status(), want, "case: {name}");
        assert_eq!(
            response.headers().get(header::VARY).unwrap(),
            "Authorization",
            "case: {name}"
        );
        if want == StatusCode::UNAUTHORIZED {
            assert_eq!(body_json(response).await, json!({ "error": INVALID_TOKEN }), "case: {name}");
        }
    }
}

#[tokio::test]
async fn test_identity_reaches_handler() {
    let app = router(&state(rate_limit(false, 4)));

    let response = app.clone().oneshot(get_request("/whoami", None)).await.unwrap();
    assert_eq!(body_text(response).await, "anonymous");

    let response = app
        .clone()
        .oneshot(get_request("/whoami", Some(&format!("Bearer {ACTIVE_READER}"))))
        .await
        .unwrap();
    assert_eq!(body_text(response).await, "Ryan Gosling");
}

#[tokio::test]
async fn test_require_authenticated() {
    let app = router(&state(rate_limit(false, 4)));

    let cases = [
        ("ok", Some(format!("Bearer {ACTIVE_READER}")), StatusCode::OK),
        ("inactive still authenticated", Some(format!("Bearer {INACTIVE_READER}")), StatusCode::OK),
        ("bad token", Some("Bearer f".to_string()), StatusCode::UNAUTHORIZED),
        ("anonymous", None, StatusCode::UNAUTHORIZED),
    ];

    for (name, authorization, want) in cases {
        let response = app
            .clone()
            .oneshot(get_request("/testauth/v1/movies", authorization.as_deref()))
            .await
            .unwrap();
        assert_eq!(response.status(), want, "case: {name}");
    }

    let response = app
        .clone()
        .oneshot(get_request("/testauth/v1/movies", None))
        .await
        .unwrap();
    assert_eq!(
        body_json(response).await,
        json!({ "error": "you must be authenticated to access this resource" })
    );
}

#[tokio::test]
async fn test_require_activated() {
    let app = router(&state(rate_limit(false, 4)));

    let cases = [
        ("ok", Some(format!("Bearer {ACTIVE_READER}")), StatusCode::OK),
        ("bad token", Some("Bearer f".to_string()), StatusCode::UNAUTHORIZED),
        ("anonymous", None, StatusCode::UNAUTHORIZED),
        ("inactive", Some(format!("Bearer {INACTIVE_READER}")), StatusCode::FORBIDDEN),
    ];

    for (name, authorization, want) in cases {
        let response = app
            .clone()
            .oneshot(get_request("/testactivated/v1/movies", authorization.as_deref()))
            .await
            .unwrap();
        assert_eq!(response.status(), want, "case: {name}");
        if want == StatusCode::FORBIDDEN {
            assert_eq!(
                body_json(response).await,
                json!({ "error": "your user account must be activated to access this resource" })
            );
        }
    }
}

#[tokio::test]
async fn test_require_permissions() {
    let app = router(&state(rate_limit(false, 4)));

    let cases = [
        ("ok movies:read", Some(format!("Bearer {ACTIVE_READER}")), StatusCode::OK, None),
        (
            "not activated",
            Some(format!("Bearer {INACTIVE_READER}")),
            StatusCode::FORBIDDEN,
            Some("your user account must be activated to access this resource"),
        ),
        (
            "missing permission",
            Some(format!("Bearer {ACTIVE_NO_PERMS}")),
            StatusCode::FORBIDDEN,
            Some("your user account doesn't have the necessary permissions to access this resource"),
        ),
        (
            "anonymous",
            None,
            StatusCode::UNAUTHORIZED,
            Some("you must be authenticated to access this resource"),
        ),
    ];

    for (name, authorization, want, message) in cases {
        let response = app
            .clone()
            .oneshot(get_request("/testpermissions/v1/movies", authorization.as_deref()))
            .await
            .unwrap();
        assert_eq!(response.status(), want, "case: {name}");
        if let Some(message) = message {
            assert_eq!(body_json(response).await, json!({ "error": message }), "case: {name}");
        }
    }
}

#[tokio::test]
async fn test_replayed_request_gets_same_outcome() {
    let app = router(&state(rate_limit(false, 4)));

    for token in [ACTIVE_READER, INACTIVE_READER, ACTIVE_NO_PERMS] {
        let authorization = format!("Bearer {token}");
        let first = app
            .clone()
            .oneshot(get_request("/testpermissions/v1/movies", Some(&authorization)))
            .await
            .unwrap();
        let second = app
            .clone()
            .oneshot(get_request("/testpermissions/v1/movies", Some(&authorization)))
            .await
            .unwrap();
        assert_eq!(first.status(), second.status(), "token: {token}");
    }
}

#[tokio::test]
async fn test_identity_lookup_failure_is_server_error() {
    let failing = Arc::new(FailingDirectory);
    let app = router(&state_with(failing.clone(), failing));

    let response = app
        .clone()
        .oneshot(get_request("/v1/movies", Some(&format!("Bearer {ACTIVE_READER}"))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await, json!({ "error": SERVER_ERROR }));

    // Malformed tokens never reach the store.
    let response = app
        .clone()
        .oneshot(get_request("/v1/movies", Some("Bearer f")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_permission_lookup_failure_is_server_error() {
    let users = Arc::new(common::directory());
    let app = router(&state_with(users, Arc::new(FailingDirectory)));

    let response = app
        .oneshot(get_request(
            "/testpermissions/v1/movies",
            Some(&format!("Bearer {ACTIVE_READER}")),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await, json!({ "error": SERVER_ERROR }));
}

#[tokio::test]
async fn test_missing_client_address_is_server_error() {
    let app = router(&state(rate_limit(true, 4)));

    let mut request = get_request("/v1/movies", None);
    request
        .extensions_mut()
        .remove::<axum::extract::ConnectInfo<std::net::SocketAddr>>();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = router(&state(rate_limit(false, 4)));

    let response = app.oneshot(get_request("/v1/movies", None)).await.unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}
