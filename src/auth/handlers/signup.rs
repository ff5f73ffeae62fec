/**
 * Signup Handler
 *
 * This module implements the user registration handler for
 * POST /api/users/signup.
 *
 * # Registration Process
 *
 * 1. Validate username, email format, and password length
 * 2. Check if username or email already exists
 * 3. Hash password using bcrypt
 * 4. Create user in database
 * 5. Generate JWT token
 * 6. Return token and user info
 *
 * # Security
 *
 * - Passwords are hashed using bcrypt with DEFAULT_COST
 * - Passwords are never returned in responses
 */

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use bcrypt::{hash, DEFAULT_COST};
use sqlx::PgPool;

use crate::auth::handlers::types::{AuthResponse, AuthUserResponse, SignupRequest};
use crate::auth::sessions::create_token;
use crate::error::ApiError;
use crate::users::db::{create_user, get_user_by_email, get_user_by_username};

/// Validate username format
///
/// Usernames must be:
/// - 3-30 characters long
/// - Contain only alphanumeric characters and underscores
/// - Start with a letter
pub(crate) fn is_valid_username(username: &str) -> bool {
    if username.len() < 3 || username.len() > 30 {
        return false;
    }

    let mut chars = username.chars();

    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }

    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Sign up handler
///
/// Validates the input, creates a new user account, and returns a JWT token
/// for immediate authentication.
///
/// # Errors
///
/// * `400 Bad Request` - invalid username/email/password, or already taken
/// * `503 Service Unavailable` - database not configured
/// * `500 Internal Server Error` - hashing, creation, or token failure
pub async fn signup(
    State(pool): State<Option<PgPool>>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let pool = pool.ok_or(ApiError::DatabaseUnavailable)?;
    tracing::info!(
        "Signup request for username: {}, email: {}",
        request.username,
        request.email
    );

    if !is_valid_username(&request.username) {
        return Err(ApiError::validation(
            "Username must be 3-30 chars, start with a letter, and contain only letters, numbers, and underscores",
        ));
    }

    let email = request.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(ApiError::validation("Invalid email format"));
    }

    if request.password.len() < 8 {
        return Err(ApiError::validation(
            "Password must be at least 8 characters",
        ));
    }

    if get_user_by_username(&pool, &request.username).await?.is_some() {
        return Err(ApiError::validation("Username already taken"));
    }

    if get_user_by_email(&pool, &email).await?.is_some() {
        return Err(ApiError::validation("User with this email already exists."));
    }

    let password_hash = hash(&request.password, DEFAULT_COST).map_err(|e| {
        tracing::error!("Failed to hash password: {:?}", e);
        ApiError::Internal("Server error".to_string())
    })?;

    let user = create_user(&pool, request.username.clone(), email, password_hash).await?;

    let token = create_token(user.id, user.username.clone(), user.email.clone()).map_err(|e| {
        tracing::error!("Failed to create token: {:?}", e);
        ApiError::Internal("Server error".to_string())
    })?;

    tracing::info!("User created successfully: {} ({})", user.username, user.email);

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: AuthUserResponse::from_user(&user, Vec::new(), Vec::new()),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_usernames() {
        assert!(is_valid_username("alice"));
        assert!(is_valid_username("bob_42"));
        assert!(is_valid_username("Zoe"));
    }

    #[test]
    fn test_invalid_usernames() {
        assert!(!is_valid_username("ab"));
        assert!(!is_valid_username("1leading_digit"));
        assert!(!is_valid_username("_underscore_first"));
        assert!(!is_valid_username("has space"));
        assert!(!is_valid_username(&"x".repeat(31)));
    }
}
