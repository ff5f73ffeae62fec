/**
 * Post HTTP Handlers
 *
 * POST /api/posts, GET /api/posts/feed, PUT /api/posts/like/{id}
 */

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::posts::db;
use crate::posts::db::PostResponse;
use crate::server::state::AppState;
use crate::users::db::{following_ids, get_user_by_id, UserSummary};

/// Maximum characters of post text
const MAX_POST_TEXT: usize = 500;

/// Default and maximum feed page sizes
const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 50;

/// Pagination query parameters
#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageParams {
    /// Clamp to (page >= 1, 1 <= limit <= 50) and derive the row offset
    pub fn window(&self) -> (i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        ((page - 1) * limit, limit)
    }
}

/// Create a new post (multipart: `text` + optional `img` file)
pub async fn create_post(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<PostResponse>), ApiError> {
    let pool = state.db_pool.clone().ok_or(ApiError::DatabaseUnavailable)?;

    let mut text = String::new();
    let mut img: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("Invalid multipart body: {}", e)))?
    {
        match field.name() {
            Some("text") => {
                text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::validation(format!("Invalid text field: {}", e)))?;
            }
            Some("img") => {
                img = Some(state.uploads.store(field).await?);
            }
            _ => {}
        }
    }

    if text.is_empty() && img.is_none() {
        return Err(ApiError::validation("Post needs text or an image."));
    }
    if text.chars().count() > MAX_POST_TEXT {
        return Err(ApiError::validation("Post text is limited to 500 characters."));
    }

    let author = get_user_by_id(&pool, user.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found."))?;

    let post = db::create_post(
        &pool,
        UserSummary {
            id: author.id,
            username: author.username,
            profile_pic: author.profile_pic,
        },
        text,
        img,
    )
    .await?;

    tracing::info!("Post {} created by {}", post.id, user.user_id);
    Ok((StatusCode::CREATED, Json(post)))
}

/// Fetch the paginated feed.
///
/// The page is filled from followed authors' posts (the viewer included),
/// newest first; when that supply runs short the remainder comes from
/// non-followed authors, preserving recency order within each group.
pub async fn get_feed(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(params): Query<PageParams>,
) -> Result<Json<Vec<PostResponse>>, ApiError> {
    let pool = state.db_pool.clone().ok_or(ApiError::DatabaseUnavailable)?;
    let (skip, limit) = params.window();

    let mut feed_authors = following_ids(&pool, user.user_id).await?;
    feed_authors.push(user.user_id);

    let total_following = db::count_posts_by_authors(&pool, &feed_authors).await?;
    let mut posts = db::posts_by_authors(&pool, &feed_authors, limit, skip).await?;

    if let Some((backfill_skip, backfill_limit)) =
        db::backfill_window(skip, limit, posts.len(), total_following)
    {
        let mut rest =
            db::posts_excluding_authors(&pool, &feed_authors, backfill_limit, backfill_skip)
                .await?;
        posts.append(&mut rest);
    }

    Ok(Json(posts))
}

/// Toggle like/unlike on a post
pub async fn like_post(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(post_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let pool = state.db_pool.clone().ok_or(ApiError::DatabaseUnavailable)?;

    let (now_liked, likes) = db::toggle_like(&pool, post_id, user.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Post not found."))?;

    Ok(Json(serde_json::json!({
        "message": if now_liked { "Post liked." } else { "Post unliked." },
        "likes": likes,
    })))
}
