/**
 * Router Configuration
 *
 * This module provides the main router creation function that combines
 * all route configurations into a single Axum router.
 *
 * # Route Groups
 *
 * 1. Public routes: signup, login, logout, health check
 * 2. The WebSocket gateway (authenticates inside the handshake)
 * 3. Protected API routes behind the auth middleware
 * 4. Static serving of uploaded media under `/uploads`
 * 5. Fallback handler (404)
 */

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::services::ServeDir;

use crate::auth::{login, logout, signup};
use crate::middleware::auth::auth_middleware;
use crate::realtime::subscription::handle_gateway_upgrade;
use crate::routes::api_routes::configure_api_routes;
use crate::server::config::cors_layer;
use crate::server::state::AppState;

/// Request body ceiling; media uploads are the largest payloads
const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Create the Axum router with all routes configured
///
/// # Arguments
///
/// * `app_state` - Application state containing the pool, gateway, and
///   upload store
///
/// # Returns
///
/// Configured Axum Router ready to serve requests
pub fn create_router(app_state: AppState) -> Router<()> {
    // Protected API routes; the middleware runs only for matched routes
    let protected = configure_api_routes(Router::new()).route_layer(
        axum::middleware::from_fn_with_state(app_state.clone(), auth_middleware),
    );

    let router = Router::new()
        // Public auth endpoints
        .route("/api/users/signup", post(signup))
        .route("/api/users/login", post(login))
        .route("/api/users/logout", post(logout))
        // Health check
        .route("/api/test", get(health_check))
        // Real-time gateway (verifies its token during the handshake)
        .route("/ws", get(handle_gateway_upgrade))
        .merge(protected)
        // Uploaded media
        .nest_service("/uploads", ServeDir::new(app_state.uploads.dir()))
        .fallback(|| async { (axum::http::StatusCode::NOT_FOUND, "404 Not Found") })
        .layer(cors_layer())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES));

    router.with_state(app_state)
}

/// Health check handler (GET /api/test)
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "message": "Backend is alive" }))
}
