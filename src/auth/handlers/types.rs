/**
 * Authentication Handler Types
 *
 * This module defines the request and response types used by authentication
 * handlers. These types are shared across signup and login.
 */

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::users::db::User;

/// Sign up request
#[derive(Deserialize, Serialize, Debug)]
pub struct SignupRequest {
    /// User's chosen username (3-30 chars, alphanumeric + underscore)
    pub username: String,
    /// User's email address
    pub email: String,
    /// User's password (will be hashed before storage)
    pub password: String,
}

/// Login request
#[derive(Deserialize, Serialize, Debug)]
pub struct LoginRequest {
    /// User's email address
    pub email: String,
    /// User's password (will be verified against stored hash)
    pub password: String,
}

/// Auth response
///
/// Returned by signup and login handlers. Contains the JWT token
/// and user information for immediate authentication.
#[derive(Serialize, Debug)]
pub struct AuthResponse {
    /// JWT token for authentication
    pub token: String,
    /// User information (without sensitive data)
    pub user: AuthUserResponse,
}

/// User payload embedded in the auth response (no sensitive data)
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AuthUserResponse {
    /// User's unique ID (UUID)
    pub id: Uuid,
    /// User's username
    pub username: String,
    /// User's email address
    pub email: String,
    /// Profile picture URL
    pub profile_pic: String,
    /// IDs of users following this user
    pub followers: Vec<Uuid>,
    /// IDs of users this user follows
    pub following: Vec<Uuid>,
}

impl AuthUserResponse {
    /// Build the auth payload for a freshly created or logged-in user.
    /// Follower/following edges are loaded separately; signup starts empty.
    pub fn from_user(user: &User, followers: Vec<Uuid>, following: Vec<Uuid>) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            profile_pic: user.profile_pic.clone(),
            followers,
            following,
        }
    }
}
