/**
 * User HTTP Handlers
 *
 * Profile lookup/listing, profile updates (multipart), and the follow toggle.
 */

use axum::extract::{Multipart, Path, State};
use axum::Json;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::server::state::AppState;
use crate::users::db;
use crate::users::db::{ProfileUpdate, UserProfile, UserSummary};

/// Get any user by ID, with followers/following/posts populated
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserProfile>, ApiError> {
    let pool = state.db_pool.as_ref().ok_or(ApiError::DatabaseUnavailable)?;

    let profile = db::load_profile(pool, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found."))?;

    Ok(Json(profile))
}

/// List all users as compact summaries
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let pool = state.db_pool.as_ref().ok_or(ApiError::DatabaseUnavailable)?;
    Ok(Json(db::list_users(pool).await?))
}

/// Update profile picture, bio, organization, skills
/// (multipart: `profilePic` file + text fields; `skills` is a JSON-encoded
/// string array)
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(user_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<UserProfile>, ApiError> {
    let pool = state.db_pool.clone().ok_or(ApiError::DatabaseUnavailable)?;

    if user_id != user.user_id {
        return Err(ApiError::Forbidden("Unauthorized.".to_string()));
    }

    let mut update = ProfileUpdate::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("Invalid multipart body: {}", e)))?
    {
        match field.name() {
            Some("profilePic") => {
                update.profile_pic = Some(state.uploads.store(field).await?);
            }
            Some("bio") => {
                update.bio = Some(read_text(field).await?);
            }
            Some("organization") => {
                update.organization = Some(read_text(field).await?);
            }
            Some("skills") => {
                let raw = read_text(field).await?;
                let skills: Vec<String> = serde_json::from_str(&raw)
                    .map_err(|_| ApiError::validation("skills must be a JSON array of strings"))?;
                update.skills = Some(skills);
            }
            _ => {}
        }
    }

    db::update_profile(&pool, user_id, update).await?;

    let profile = db::load_profile(&pool, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found."))?;

    Ok(Json(profile))
}

/// Follow / unfollow a user (symmetric toggle)
pub async fn follow_user(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(target_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let pool = state.db_pool.clone().ok_or(ApiError::DatabaseUnavailable)?;

    if target_id == user.user_id {
        return Err(ApiError::validation("You cannot follow yourself."));
    }

    if db::get_user_by_id(&pool, target_id).await?.is_none() {
        return Err(ApiError::not_found("User not found."));
    }

    let now_following = db::toggle_follow(&pool, user.user_id, target_id).await?;

    Ok(Json(serde_json::json!({
        "message": if now_following {
            "Followed successfully."
        } else {
            "Unfollowed successfully."
        },
    })))
}

/// Read a multipart text field
async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::validation(format!("Invalid text field: {}", e)))
}
