/**
 * Server Initialization
 *
 * This module handles the initialization and setup of the Axum HTTP server,
 * including state creation, database loading, and route configuration.
 *
 * # Initialization Process
 *
 * 1. Load optional services (database)
 * 2. Create the gateway hub and upload store
 * 3. Create and configure the router
 * 4. Start the periodic gateway room cleanup task
 */

use axum::Router;

use crate::realtime::rooms::Gateway;
use crate::routes::router::create_router;
use crate::server::config::{load_database, upload_dir};
use crate::server::state::AppState;
use crate::uploads::UploadStore;

/// Create and configure the Axum application
///
/// # Returns
///
/// Configured Axum Router ready to serve requests
///
/// # Error Handling
///
/// The function is designed to be resilient:
/// - Missing database: server continues, data endpoints answer 503
/// - Migration failures: logged but don't prevent startup
/// - Upload directory creation failures: logged, uploads will fail at use
pub async fn create_app() -> Router<()> {
    tracing::info!("Initializing Verse backend server");

    let db_pool = load_database().await;

    let uploads = UploadStore::new(upload_dir());
    if let Err(e) = uploads.ensure_dir().await {
        tracing::error!("Failed to create upload directory {:?}: {:?}", uploads.dir(), e);
    }

    let gateway = Gateway::new();

    let app_state = AppState {
        db_pool,
        gateway,
        uploads,
    };

    let app = create_router(app_state.clone());

    // Periodically drop gateway rooms whose subscribers all disconnected
    let cleanup_gateway = app_state.gateway.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            cleanup_gateway.cleanup_inactive_rooms();
            tracing::debug!("Cleaned up inactive gateway rooms");
        }
    });

    tracing::info!("Router configured with periodic cleanup task");

    app
}
