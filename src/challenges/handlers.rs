/**
 * Challenge HTTP Handlers
 *
 * One handler set serves both `/api/challenges` and `/api/polls`; the mount
 * point contributes the entity kind via an `Extension` layer.
 */

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::challenges::db;
use crate::challenges::db::{CreateOutcome, FinalizeOutcome, SubmitOutcome, VoteOutcome};
use crate::challenges::{
    attempts_left, start_of_local_day, ChallengeKind, VoteSide, DAILY_CREATION_LIMIT, ENTRY_FEE,
};
use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::server::state::AppState;
use crate::users::db::get_user_by_id;

/// Vote request body
#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub option: VoteSide,
}

/// Start a new entry or match a waiting one
/// (multipart: `category`/`skill` + optional `challengerSubmission` file)
pub async fn create_entry(
    State(state): State<AppState>,
    Extension(kind): Extension<ChallengeKind>,
    AuthUser(user): AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let pool = state.db_pool.clone().ok_or(ApiError::DatabaseUnavailable)?;

    let mut category = String::new();
    let mut submission: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("Invalid multipart body: {}", e)))?
    {
        match field.name() {
            // The challenge UI calls it a skill, the poll UI a category
            Some("category") | Some("skill") => {
                category = field
                    .text()
                    .await
                    .map_err(|e| ApiError::validation(format!("Invalid category field: {}", e)))?;
            }
            Some("challengerSubmission") => {
                submission = Some(state.uploads.store(field).await?);
            }
            _ => {}
        }
    }

    let category = category.trim().to_lowercase();
    if category.is_empty() {
        return Err(ApiError::validation("Category is required."));
    }

    let me = get_user_by_id(&pool, user.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found."))?;
    if me.verse_points < ENTRY_FEE {
        return Err(ApiError::domain("Not enough versePoints."));
    }

    let used_today =
        db::count_created_since(&pool, user.user_id, kind, start_of_local_day()).await?;
    if used_today >= DAILY_CREATION_LIMIT {
        return Err(ApiError::domain("3 challenges per day max."));
    }
    let attempts_left = attempts_left(used_today);

    let outcome =
        db::create_or_match(&pool, kind, &category, user.user_id, submission.as_deref()).await?;

    let (status, message, challenge_id) = match outcome {
        CreateOutcome::Matched(id) => (StatusCode::OK, "Matched! You can vote now.", id),
        CreateOutcome::Created(id) => {
            (StatusCode::CREATED, "Challenge created. Waiting for match.", id)
        }
        CreateOutcome::InsufficientFunds => {
            return Err(ApiError::domain("Not enough versePoints."));
        }
    };

    let challenge = db::get_by_id(&pool, challenge_id, user.user_id)
        .await?
        .ok_or_else(|| ApiError::Internal("Entry vanished after creation".to_string()))?;

    Ok((
        status,
        Json(json!({
            "message": message,
            "challenge": challenge,
            "attemptsLeft": attempts_left,
        })),
    ))
}

/// Attach the opponent's submission (multipart: `challengedSubmission` file)
pub async fn submit_entry(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(challenge_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let pool = state.db_pool.clone().ok_or(ApiError::DatabaseUnavailable)?;

    let mut submission: Option<String> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("Invalid multipart body: {}", e)))?
    {
        if let Some("challengedSubmission") = field.name() {
            submission = Some(state.uploads.store(field).await?);
        }
    }
    let submission = submission.ok_or_else(|| ApiError::validation("No file uploaded."))?;

    match db::submit_opponent(&pool, challenge_id, user.user_id, &submission).await? {
        SubmitOutcome::Updated(id) => {
            let challenge = db::get_by_id(&pool, id, user.user_id)
                .await?
                .ok_or_else(|| ApiError::not_found("Challenge not found."))?;
            Ok(Json(json!({
                "message": "Submission updated.",
                "challenge": challenge,
            })))
        }
        SubmitOutcome::NotAllowed => Err(ApiError::Forbidden(
            "Not authorized or already submitted.".to_string(),
        )),
        SubmitOutcome::NotFound => Err(ApiError::not_found("Challenge not found.")),
    }
}

/// Vote on a closed entry
pub async fn vote_entry(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(challenge_id): Path<Uuid>,
    Json(request): Json<VoteRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let pool = state.db_pool.clone().ok_or(ApiError::DatabaseUnavailable)?;

    match db::record_vote(&pool, challenge_id, user.user_id, request.option).await? {
        VoteOutcome::Recorded => {
            let challenge = db::get_by_id(&pool, challenge_id, user.user_id)
                .await?
                .ok_or_else(|| ApiError::not_found("Challenge not found."))?;
            Ok(Json(json!({
                "message": "Vote counted.",
                "challenge": challenge,
            })))
        }
        VoteOutcome::Rejected => Err(ApiError::domain("Cannot vote (self or already voted).")),
        VoteOutcome::NotFound => Err(ApiError::not_found("Challenge not found.")),
    }
}

/// Finalize a closed entry and award the winner
pub async fn finalize_entry(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(challenge_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let pool = state.db_pool.clone().ok_or(ApiError::DatabaseUnavailable)?;

    match db::finalize(&pool, challenge_id).await? {
        FinalizeOutcome::Finalized { .. } => {
            let challenge = db::get_by_id(&pool, challenge_id, user.user_id)
                .await?
                .ok_or_else(|| ApiError::not_found("Challenge not found."))?;
            Ok(Json(json!({
                "message": "Challenge finalized.",
                "challenge": challenge,
            })))
        }
        FinalizeOutcome::AlreadyFinalized => Err(ApiError::domain("Already finalized.")),
        FinalizeOutcome::StillOpen => Err(ApiError::domain("Still open.")),
        FinalizeOutcome::NotFound => Err(ApiError::not_found("Challenge not found.")),
    }
}

/// Cancel the caller's pending entry and refund the fee
pub async fn cancel_entry(
    State(state): State<AppState>,
    Extension(kind): Extension<ChallengeKind>,
    AuthUser(user): AuthUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let pool = state.db_pool.clone().ok_or(ApiError::DatabaseUnavailable)?;

    if db::cancel_pending(&pool, user.user_id, kind).await? {
        Ok(Json(json!({ "message": "Challenge cancelled and refunded." })))
    } else {
        Err(ApiError::not_found("No pending challenge to cancel."))
    }
}

/// List entries grouped as active / pending / past
pub async fn list_entries(
    State(state): State<AppState>,
    Extension(kind): Extension<ChallengeKind>,
    AuthUser(user): AuthUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let pool = state.db_pool.clone().ok_or(ApiError::DatabaseUnavailable)?;

    let active = db::list_active(&pool, kind, user.user_id).await?;
    let pending = db::list_pending(&pool, kind, user.user_id).await?;
    let past = db::list_past(&pool, kind, user.user_id).await?;

    Ok(Json(json!({
        "active": active,
        "pending": pending,
        "past": past,
    })))
}

/// Get a single entry with tallies and the viewer's has-voted flag
pub async fn get_entry(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(challenge_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let pool = state.db_pool.clone().ok_or(ApiError::DatabaseUnavailable)?;

    let challenge = db::get_by_id(&pool, challenge_id, user.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Challenge not found."))?;

    Ok(Json(json!({ "challenge": challenge })))
}
