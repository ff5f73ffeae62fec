/**
 * Current User Handler
 *
 * Implements GET /api/users/me: the authenticated user's full profile with
 * followers, following, and posts populated.
 */

use axum::extract::State;
use axum::response::Json;

use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::server::state::AppState;
use crate::users::db::{load_profile, UserProfile};

/// Get the currently authenticated user's profile
///
/// # Errors
///
/// * `404 Not Found` - the token's user no longer exists
/// * `503 Service Unavailable` - database not configured
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<UserProfile>, ApiError> {
    let pool = state.db_pool.as_ref().ok_or(ApiError::DatabaseUnavailable)?;

    let profile = load_profile(pool, user.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found."))?;

    Ok(Json(profile))
}
