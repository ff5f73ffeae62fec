/**
 * Login Handler
 *
 * Implements POST /api/users/login and the client-side logout endpoint.
 *
 * The login handler verifies the password against the stored bcrypt hash and
 * returns a fresh JWT token with the user's social edges populated.
 */

use axum::extract::State;
use axum::response::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::handlers::types::{AuthResponse, AuthUserResponse, LoginRequest};
use crate::auth::sessions::create_token;
use crate::error::ApiError;
use crate::users::db::get_user_by_email;

/// Login handler
///
/// # Errors
///
/// * `400 Bad Request` - missing email or password
/// * `401 Unauthorized` - unknown email or wrong password
/// * `503 Service Unavailable` - database not configured
pub async fn login(
    State(pool): State<Option<PgPool>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let pool = pool.ok_or(ApiError::DatabaseUnavailable)?;

    if request.email.is_empty() || request.password.is_empty() {
        return Err(ApiError::validation("Email and password are required."));
    }

    let user = get_user_by_email(&pool, &request.email.trim().to_lowercase())
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password.".to_string()))?;

    let valid = bcrypt::verify(&request.password, &user.password_hash).map_err(|e| {
        tracing::error!("Failed to verify password: {:?}", e);
        ApiError::Internal("Server error".to_string())
    })?;

    if !valid {
        return Err(ApiError::Unauthorized("Invalid email or password.".to_string()));
    }

    let followers: Vec<(Uuid,)> =
        sqlx::query_as("SELECT follower_id FROM follows WHERE followee_id = $1")
            .bind(user.id)
            .fetch_all(&pool)
            .await?;
    let following: Vec<(Uuid,)> =
        sqlx::query_as("SELECT followee_id FROM follows WHERE follower_id = $1")
            .bind(user.id)
            .fetch_all(&pool)
            .await?;

    let token = create_token(user.id, user.username.clone(), user.email.clone()).map_err(|e| {
        tracing::error!("Failed to create token: {:?}", e);
        ApiError::Internal("Server error".to_string())
    })?;

    tracing::info!("User logged in: {}", user.username);

    Ok(Json(AuthResponse {
        token,
        user: AuthUserResponse::from_user(
            &user,
            followers.into_iter().map(|(id,)| id).collect(),
            following.into_iter().map(|(id,)| id).collect(),
        ),
    }))
}

/// Logout handler
///
/// Token invalidation is client-side (the client discards the token), so this
/// endpoint only acknowledges the request.
pub async fn logout() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Logged out successfully." }))
}
