/**
 * User Model and Database Operations
 *
 * This module handles user data and database operations: account creation,
 * lookups, profile updates, and the follow graph.
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// User struct representing a user in the database
///
/// Serialized with camelCase keys to match the client's wire format.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user ID (UUID)
    pub id: Uuid,
    /// Username (unique)
    pub username: String,
    /// User email address
    pub email: String,
    /// Hashed password (bcrypt); never serialized into responses
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Profile picture URL (empty if unset)
    pub profile_pic: String,
    /// Short bio
    pub bio: String,
    /// Organization
    pub organization: String,
    /// Skills list, stored lowercase
    pub skills: Vec<String>,
    /// versePoints balance (in-app currency)
    pub verse_points: i32,
    /// Points earned from voting since the last reset
    pub vote_points_earned_today: i32,
    /// When the user last earned a vote point (drives the daily reset)
    pub last_vote_date: Option<DateTime<Utc>>,
    /// Created at timestamp
    pub created_at: DateTime<Utc>,
    /// Updated at timestamp
    pub updated_at: DateTime<Utc>,
}

/// Compact user reference used when populating followers/likes/etc.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub profile_pic: String,
}

/// Compact post reference embedded in profile payloads
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PostSummary {
    pub id: Uuid,
    pub text: String,
    pub img: Option<String>,
}

/// Full profile payload: user fields plus populated social edges and posts
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub profile_pic: String,
    pub bio: String,
    pub organization: String,
    pub skills: Vec<String>,
    pub verse_points: i32,
    pub followers: Vec<UserSummary>,
    pub following: Vec<UserSummary>,
    pub posts: Vec<PostSummary>,
    pub created_at: DateTime<Utc>,
}

/// Create a new user
///
/// # Arguments
/// * `pool` - Database connection pool
/// * `username` - User's chosen username
/// * `email` - User email
/// * `password_hash` - Hashed password
///
/// # Returns
/// Created user or error
pub async fn create_user(
    pool: &PgPool,
    username: String,
    email: String,
    password_hash: String,
) -> Result<User, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, username, email, password_hash, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, username, email, password_hash, profile_pic, bio, organization, skills,
                  verse_points, vote_points_earned_today, last_vote_date, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(&username)
    .bind(&email)
    .bind(&password_hash)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(user)
}

/// Get user by email
pub async fn get_user_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, email, password_hash, profile_pic, bio, organization, skills,
               verse_points, vote_points_earned_today, last_vote_date, created_at, updated_at
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await
}

/// Get user by username
pub async fn get_user_by_username(
    pool: &PgPool,
    username: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, email, password_hash, profile_pic, bio, organization, skills,
               verse_points, vote_points_earned_today, last_vote_date, created_at, updated_at
        FROM users
        WHERE username = $1
        "#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await
}

/// Get user by ID
pub async fn get_user_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, email, password_hash, profile_pic, bio, organization, skills,
               verse_points, vote_points_earned_today, last_vote_date, created_at, updated_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// List all users as compact summaries
pub async fn list_users(pool: &PgPool) -> Result<Vec<UserSummary>, sqlx::Error> {
    sqlx::query_as::<_, UserSummary>(
        "SELECT id, username, profile_pic FROM users ORDER BY username ASC",
    )
    .fetch_all(pool)
    .await
}

/// Profile fields a user may change about themselves
#[derive(Debug, Default)]
pub struct ProfileUpdate {
    pub profile_pic: Option<String>,
    pub bio: Option<String>,
    pub organization: Option<String>,
    pub skills: Option<Vec<String>>,
}

/// Apply a partial profile update; absent fields are left untouched.
/// Skills are normalized to lowercase before storage.
pub async fn update_profile(
    pool: &PgPool,
    user_id: Uuid,
    update: ProfileUpdate,
) -> Result<User, sqlx::Error> {
    let skills = update
        .skills
        .map(|s| s.into_iter().map(|skill| skill.to_lowercase()).collect::<Vec<_>>());

    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET profile_pic = COALESCE($1, profile_pic),
            bio = COALESCE($2, bio),
            organization = COALESCE($3, organization),
            skills = COALESCE($4, skills),
            updated_at = $5
        WHERE id = $6
        RETURNING id, username, email, password_hash, profile_pic, bio, organization, skills,
                  verse_points, vote_points_earned_today, last_vote_date, created_at, updated_at
        "#,
    )
    .bind(update.profile_pic)
    .bind(update.bio)
    .bind(update.organization)
    .bind(skills)
    .bind(Utc::now())
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(user)
}

/// Load the full profile payload for a user: followers, following, and posts
/// populated as compact summaries.
pub async fn load_profile(pool: &PgPool, id: Uuid) -> Result<Option<UserProfile>, sqlx::Error> {
    let user = match get_user_by_id(pool, id).await? {
        Some(user) => user,
        None => return Ok(None),
    };

    let followers = sqlx::query_as::<_, UserSummary>(
        r#"
        SELECT u.id, u.username, u.profile_pic
        FROM follows f
        JOIN users u ON u.id = f.follower_id
        WHERE f.followee_id = $1
        ORDER BY u.username ASC
        "#,
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    let following = sqlx::query_as::<_, UserSummary>(
        r#"
        SELECT u.id, u.username, u.profile_pic
        FROM follows f
        JOIN users u ON u.id = f.followee_id
        WHERE f.follower_id = $1
        ORDER BY u.username ASC
        "#,
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    let posts = sqlx::query_as::<_, PostSummary>(
        "SELECT id, text, img FROM posts WHERE posted_by = $1 ORDER BY created_at DESC",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    Ok(Some(UserProfile {
        id: user.id,
        username: user.username,
        email: user.email,
        profile_pic: user.profile_pic,
        bio: user.bio,
        organization: user.organization,
        skills: user.skills,
        verse_points: user.verse_points,
        followers,
        following,
        posts,
        created_at: user.created_at,
    }))
}

/// IDs the given user follows (used by feed assembly)
pub async fn following_ids(pool: &PgPool, user_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
    let rows: Vec<(Uuid,)> =
        sqlx::query_as("SELECT followee_id FROM follows WHERE follower_id = $1")
            .bind(user_id)
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Toggle the follow edge between two users.
///
/// The edge is a single row, so adding/removing it updates the follower's
/// "following" set and the target's "followers" set in one step. Returns
/// `true` when the edge now exists (followed), `false` when it was removed.
pub async fn toggle_follow(
    pool: &PgPool,
    follower_id: Uuid,
    followee_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let removed = sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND followee_id = $2")
        .bind(follower_id)
        .bind(followee_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let now_following = if removed == 0 {
        sqlx::query(
            r#"
            INSERT INTO follows (follower_id, followee_id, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (follower_id, followee_id) DO NOTHING
            "#,
        )
        .bind(follower_id)
        .bind(followee_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
        true
    } else {
        false
    };

    tx.commit().await?;
    Ok(now_following)
}
