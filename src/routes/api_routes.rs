/**
 * API Route Handlers
 *
 * This module wires the protected API surface:
 *
 * ## Users
 * - `GET /api/users/me` - current user's profile
 * - `GET /api/users` - user listing
 * - `GET /api/users/{id}` - any user's profile
 * - `PUT /api/users/{id}/update-profile` - profile update (multipart)
 * - `PUT /api/users/{id}/follow` - follow toggle
 *
 * ## Posts
 * - `POST /api/posts` - create post (multipart)
 * - `GET /api/posts/feed` - paginated feed
 * - `PUT /api/posts/like/{id}` - like toggle
 *
 * ## Messages
 * - `POST /api/messages` - send (multipart)
 * - `GET /api/messages/threads` - thread listing
 * - `GET /api/messages/conversation/{user_id}` - conversation history
 * - `PUT /api/messages/conversation/{user_id}/read` - mark read
 *
 * ## Challenges / Polls
 * The same handler set is mounted at `/api/challenges` and `/api/polls`;
 * the mount point injects the entity kind as an `Extension`.
 */

use axum::routing::{delete, get, post, put};
use axum::{Extension, Router};

use crate::auth::get_me;
use crate::challenges::handlers::{
    cancel_entry, create_entry, finalize_entry, get_entry, list_entries, submit_entry, vote_entry,
};
use crate::challenges::ChallengeKind;
use crate::messages::handlers::{
    get_conversation, get_threads, mark_conversation_read, send_message,
};
use crate::posts::handlers::{create_post, get_feed, like_post};
use crate::server::state::AppState;
use crate::users::handlers::{follow_user, get_user, list_users, update_profile};

/// Configure all authenticated API routes
pub fn configure_api_routes(router: Router<AppState>) -> Router<AppState> {
    let challenge_routes = Router::new()
        .route("/", post(create_entry).get(list_entries))
        .route("/cancel", delete(cancel_entry))
        .route("/{id}", get(get_entry))
        .route("/{id}/submission", put(submit_entry))
        .route("/{id}/vote", put(vote_entry))
        .route("/{id}/finalize", put(finalize_entry));

    router
        // Users
        .route("/api/users/me", get(get_me))
        .route("/api/users", get(list_users))
        .route("/api/users/{id}", get(get_user))
        .route("/api/users/{id}/update-profile", put(update_profile))
        .route("/api/users/{id}/follow", put(follow_user))
        // Posts
        .route("/api/posts", post(create_post))
        .route("/api/posts/feed", get(get_feed))
        .route("/api/posts/like/{id}", put(like_post))
        // Messages
        .route("/api/messages", post(send_message))
        .route("/api/messages/threads", get(get_threads))
        .route("/api/messages/conversation/{user_id}", get(get_conversation))
        .route(
            "/api/messages/conversation/{user_id}/read",
            put(mark_conversation_read),
        )
        // Challenges and polls share handlers; the mount point sets the kind
        .nest(
            "/api/challenges",
            challenge_routes
                .clone()
                .layer(Extension(ChallengeKind::Challenge)),
        )
        .nest(
            "/api/polls",
            challenge_routes.layer(Extension(ChallengeKind::Poll)),
        )
}
