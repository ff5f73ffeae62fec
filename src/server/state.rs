/**
 * Application State Management
 *
 * This module defines the application state structure and implements
 * the necessary `FromRef` traits for Axum state extraction.
 *
 * # Architecture
 *
 * The `AppState` struct is the central state container:
 * - Optional PostgreSQL connection pool (the single durable store)
 * - The real-time gateway hub (rooms + presence registry)
 * - The upload store (where media lands on disk)
 *
 * # Thread Safety
 *
 * All fields are cheap clones over shared interior state; handlers receive
 * clones and never hold long-lived aliases to database entities. Every
 * mutation goes back through the pool as a conditional update or a
 * transaction.
 */

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::realtime::rooms::Gateway;
use crate::uploads::UploadStore;

/// Application state shared by every handler
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    ///
    /// `None` if the database is not configured (`DATABASE_URL` unset).
    /// Data endpoints answer 503 in that case.
    pub db_pool: Option<PgPool>,

    /// Real-time gateway hub: per-user rooms and the presence registry
    pub gateway: Gateway,

    /// Upload directory for media attachments
    pub uploads: UploadStore,
}

/// Allow handlers to extract the optional database pool directly
impl FromRef<AppState> for Option<PgPool> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.db_pool.clone()
    }
}

/// Allow handlers to extract the gateway directly
impl FromRef<AppState> for Gateway {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.gateway.clone()
    }
}

/// Allow handlers to extract the upload store directly
impl FromRef<AppState> for UploadStore {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.uploads.clone()
    }
}
