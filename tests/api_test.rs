//! Router-level tests that run without a database: public endpoints,
//! auth gating, and the gateway handshake.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use verse::realtime::Gateway;
use verse::routes::create_router;
use verse::server::AppState;
use verse::uploads::UploadStore;

fn test_app() -> axum::Router {
    let state = AppState {
        db_pool: None,
        gateway: Gateway::new(),
        uploads: UploadStore::new("target/test-uploads"),
    };
    create_router(state)
}

async fn body_json(body: Body) -> serde_json::Value {
    let bytes = axum::body::to_bytes(body, 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = test_app();

    let response = app
        .oneshot(Request::get("/api/test").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response.into_body()).await;
    assert_eq!(json["message"], "Backend is alive");
}

#[tokio::test]
async fn test_protected_route_requires_token() {
    let app = test_app();

    let response = app
        .oneshot(Request::get("/api/posts/feed").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_rejects_malformed_token() {
    let app = test_app();

    let response = app
        .oneshot(
            Request::get("/api/messages/threads")
                .header("Authorization", "Bearer not.a.token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_signup_without_database_is_unavailable() {
    let app = test_app();

    let response = app
        .oneshot(
            Request::post("/api/users/signup")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    r#"{"username":"alice","email":"alice@example.com","password":"password123"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_json(response.into_body()).await;
    assert_eq!(json["message"], "Database not configured");
}

#[tokio::test]
async fn test_logout_is_public() {
    let app = test_app();

    let response = app
        .oneshot(Request::post("/api/users/logout").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = test_app();

    let response = app
        .oneshot(Request::get("/api/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_gateway_handshake_rejects_missing_token() {
    let app = test_app();

    let response = app
        .oneshot(
            Request::get("/ws")
                .header("Connection", "upgrade")
                .header("Upgrade", "websocket")
                .header("Sec-WebSocket-Version", "13")
                .header("Sec-WebSocket-Key", "dGhlIHNhbXBsZSBub25jZQ==")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_gateway_handshake_rejects_bad_token() {
    let app = test_app();

    let response = app
        .oneshot(
            Request::get("/ws?token=garbage")
                .header("Connection", "upgrade")
                .header("Upgrade", "websocket")
                .header("Sec-WebSocket-Version", "13")
                .header("Sec-WebSocket-Key", "dGhlIHNhbXBsZSBub25jZQ==")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
