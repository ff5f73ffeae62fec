/**
 * Post Model and Database Operations
 *
 * Posts are immutable after creation except for their like set. The feed is
 * assembled from two recency-ordered groups: posts by followed authors
 * (viewer included), backfilled with posts by everyone else.
 */

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::users::db::UserSummary;

/// Post payload returned by the API, author populated
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: Uuid,
    pub posted_by: UserSummary,
    pub text: String,
    pub img: Option<String>,
    /// IDs of users who liked the post
    pub likes: Vec<Uuid>,
    pub replies: Vec<ReplyResponse>,
    pub created_at: DateTime<Utc>,
}

/// Reply embedded in a post payload
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReplyResponse {
    pub user_id: Uuid,
    pub username: String,
    pub user_profile_pic: String,
    pub text: String,
}

/// Create a new post and return the response payload
pub async fn create_post(
    pool: &PgPool,
    author: UserSummary,
    text: String,
    img: Option<String>,
) -> Result<PostResponse, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO posts (id, posted_by, text, img, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(author.id)
    .bind(&text)
    .bind(&img)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(PostResponse {
        id,
        posted_by: author,
        text,
        img,
        likes: Vec::new(),
        replies: Vec::new(),
        created_at: now,
    })
}

/// Count posts authored by any of the given users
pub async fn count_posts_by_authors(pool: &PgPool, authors: &[Uuid]) -> Result<i64, sqlx::Error> {
    let row = sqlx::query("SELECT COUNT(*) AS count FROM posts WHERE posted_by = ANY($1)")
        .bind(authors)
        .fetch_one(pool)
        .await?;
    Ok(row.get("count"))
}

/// Posts by the given authors, newest first
pub async fn posts_by_authors(
    pool: &PgPool,
    authors: &[Uuid],
    limit: i64,
    offset: i64,
) -> Result<Vec<PostResponse>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT p.id, p.text, p.img, p.created_at,
               u.id AS author_id, u.username, u.profile_pic
        FROM posts p
        JOIN users u ON u.id = p.posted_by
        WHERE p.posted_by = ANY($1)
        ORDER BY p.created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(authors)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    hydrate_posts(pool, rows).await
}

/// Posts by everyone except the given authors, newest first (feed backfill)
pub async fn posts_excluding_authors(
    pool: &PgPool,
    authors: &[Uuid],
    limit: i64,
    offset: i64,
) -> Result<Vec<PostResponse>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT p.id, p.text, p.img, p.created_at,
               u.id AS author_id, u.username, u.profile_pic
        FROM posts p
        JOIN users u ON u.id = p.posted_by
        WHERE NOT (p.posted_by = ANY($1))
        ORDER BY p.created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(authors)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    hydrate_posts(pool, rows).await
}

/// Attach like sets and replies to a page of post rows
async fn hydrate_posts(
    pool: &PgPool,
    rows: Vec<sqlx::postgres::PgRow>,
) -> Result<Vec<PostResponse>, sqlx::Error> {
    let post_ids: Vec<Uuid> = rows.iter().map(|row| row.get("id")).collect();

    let mut likes: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    let like_rows = sqlx::query(
        "SELECT post_id, user_id FROM post_likes WHERE post_id = ANY($1) ORDER BY created_at",
    )
    .bind(&post_ids)
    .fetch_all(pool)
    .await?;
    for row in like_rows {
        likes
            .entry(row.get("post_id"))
            .or_default()
            .push(row.get("user_id"));
    }

    let mut replies: HashMap<Uuid, Vec<ReplyResponse>> = HashMap::new();
    let reply_rows = sqlx::query(
        r#"
        SELECT post_id, user_id, username, user_profile_pic, text
        FROM post_replies
        WHERE post_id = ANY($1)
        ORDER BY created_at
        "#,
    )
    .bind(&post_ids)
    .fetch_all(pool)
    .await?;
    for row in reply_rows {
        replies.entry(row.get("post_id")).or_default().push(ReplyResponse {
            user_id: row.get("user_id"),
            username: row.get("username"),
            user_profile_pic: row.get("user_profile_pic"),
            text: row.get("text"),
        });
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let id: Uuid = row.get("id");
            PostResponse {
                id,
                posted_by: UserSummary {
                    id: row.get("author_id"),
                    username: row.get("username"),
                    profile_pic: row.get("profile_pic"),
                },
                text: row.get("text"),
                img: row.get("img"),
                likes: likes.remove(&id).unwrap_or_default(),
                replies: replies.remove(&id).unwrap_or_default(),
                created_at: row.get("created_at"),
            }
        })
        .collect())
}

/// Toggle the viewer's membership in a post's like set.
///
/// Returns `None` when the post does not exist, otherwise `(now_liked,
/// resulting like set)`.
pub async fn toggle_like(
    pool: &PgPool,
    post_id: Uuid,
    user_id: Uuid,
) -> Result<Option<(bool, Vec<Uuid>)>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let exists = sqlx::query("SELECT 1 FROM posts WHERE id = $1")
        .bind(post_id)
        .fetch_optional(&mut *tx)
        .await?
        .is_some();
    if !exists {
        return Ok(None);
    }

    let removed = sqlx::query("DELETE FROM post_likes WHERE post_id = $1 AND user_id = $2")
        .bind(post_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let now_liked = if removed == 0 {
        sqlx::query(
            r#"
            INSERT INTO post_likes (post_id, user_id, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (post_id, user_id) DO NOTHING
            "#,
        )
        .bind(post_id)
        .bind(user_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
        true
    } else {
        false
    };

    let likes: Vec<(Uuid,)> =
        sqlx::query_as("SELECT user_id FROM post_likes WHERE post_id = $1 ORDER BY created_at")
            .bind(post_id)
            .fetch_all(&mut *tx)
            .await?;

    tx.commit().await?;
    Ok(Some((now_liked, likes.into_iter().map(|(id,)| id).collect())))
}

/// Offset and limit for the non-followed backfill group.
///
/// The followed group consumed the first `total_following` posts of the
/// overall ordering; whatever part of the requested window lies past it is
/// served from the non-followed group. Returns `None` when the page is
/// already full.
pub(crate) fn backfill_window(
    skip: i64,
    limit: i64,
    fetched: usize,
    total_following: i64,
) -> Option<(i64, i64)> {
    let missing = limit - fetched as i64;
    if missing <= 0 {
        return None;
    }
    let skip_over = (skip - total_following).max(0);
    Some((skip_over, missing))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backfill_window_full_page() {
        // Page satisfied entirely by followed authors
        assert_eq!(backfill_window(0, 10, 10, 42), None);
    }

    #[test]
    fn test_backfill_window_partial_page() {
        // 4 followed posts on page one, 6 more needed from the start of the
        // non-followed group
        assert_eq!(backfill_window(0, 10, 4, 4), Some((0, 6)));
    }

    #[test]
    fn test_backfill_window_deep_page() {
        // Page 3 (skip 20) with only 4 followed posts in total: the followed
        // group is exhausted, skip past the 16 non-followed posts already
        // served on earlier pages
        assert_eq!(backfill_window(20, 10, 0, 4), Some((16, 10)));
    }

    #[test]
    fn test_backfill_window_never_negative_skip() {
        assert_eq!(backfill_window(0, 10, 0, 25), Some((0, 10)));
    }
}
