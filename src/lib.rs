//! Verse - Backend Library
//!
//! Verse is a social platform backend: a content feed, a skill-based
//! challenge/poll voting game, direct messaging, and follow relationships,
//! served as a REST API with a WebSocket gateway for real-time delivery and
//! presence.
//!
//! # Module Structure
//!
//! - **`server`** - Server initialization, application state, configuration
//! - **`routes`** - HTTP route configuration and router assembly
//! - **`auth`** - JWT sessions and the signup/login/me handlers
//! - **`users`** - User records, profiles, and the follow graph
//! - **`posts`** - Posts, the feed, and the like toggle
//! - **`messages`** - Direct messaging and read-state tracking
//! - **`challenges`** - Challenge/poll matchmaking, voting, finalizing
//! - **`realtime`** - The WebSocket gateway: rooms, events, presence
//! - **`uploads`** - Media attachment storage
//! - **`middleware`** - Authentication middleware
//! - **`error`** - API error type
//!
//! # State Management
//!
//! Handlers share an `AppState` holding the optional database pool, the
//! gateway hub, and the upload store. Durable state lives only in the
//! database; handlers hold entity IDs, never long-lived in-memory copies,
//! and every mutation is a conditional update or a transaction.

pub mod auth;
pub mod challenges;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod posts;
pub mod realtime;
pub mod routes;
pub mod server;
pub mod uploads;
pub mod users;

pub use error::ApiError;
pub use server::create_app;
