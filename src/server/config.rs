/**
 * Server Configuration
 *
 * This module handles loading and validation of server configuration:
 * the optional PostgreSQL database connection, the upload directory, and
 * the CORS origin.
 *
 * # Configuration Sources
 *
 * Configuration is loaded from environment variables, with sensible defaults
 * for local development when possible:
 *
 * - `DATABASE_URL` - PostgreSQL connection string (optional)
 * - `UPLOAD_DIR` - where uploaded media is written (default `public/uploads`)
 * - `CLIENT_URL` - allowed CORS origin (default: any origin)
 * - `SERVER_PORT` - listen port (default 3000, read in `main`)
 *
 * # Error Handling
 *
 * Configuration errors are logged but do not prevent server startup.
 * A missing database leaves `db_pool` as `None` and the server runs with
 * data endpoints answering 503.
 */

use axum::http::HeaderValue;
use sqlx::PgPool;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Database configuration result
pub type DatabaseConfig = Option<PgPool>;

/// Load and initialize database connection pool
///
/// This function:
/// 1. Reads `DATABASE_URL` from environment
/// 2. Creates a PostgreSQL connection pool
/// 3. Runs database migrations
///
/// # Returns
///
/// - `Some(PgPool)` if database is successfully configured
/// - `None` if `DATABASE_URL` is not set or connection fails
pub async fn load_database() -> DatabaseConfig {
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::warn!("DATABASE_URL not set. Database features will be disabled.");
            return None;
        }
    };

    tracing::info!("Connecting to database...");

    let pool = match PgPool::connect(&database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Failed to create database connection pool: {:?}", e);
            tracing::warn!("Database features will be disabled.");
            return None;
        }
    };

    tracing::info!("Database connection pool created successfully");

    tracing::info!("Running database migrations...");
    match sqlx::migrate!().run(&pool).await {
        Ok(_) => {
            tracing::info!("Database migrations completed successfully");
        }
        Err(e) => {
            tracing::error!("Failed to run database migrations: {}", e);
            // Continue anyway - migrations might have already been run
            tracing::warn!("Continuing without migrations - database might not be up to date");
        }
    }

    Some(pool)
}

/// Upload directory from environment (default `public/uploads`)
pub fn upload_dir() -> String {
    std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "public/uploads".to_string())
}

/// CORS layer for the browser client.
///
/// Restricted to `CLIENT_URL` when set; permissive otherwise (development).
pub fn cors_layer() -> CorsLayer {
    match std::env::var("CLIENT_URL")
        .ok()
        .and_then(|origin| origin.parse::<HeaderValue>().ok())
    {
        Some(origin) => CorsLayer::new()
            .allow_origin(AllowOrigin::exact(origin))
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any),
        None => {
            tracing::warn!("CLIENT_URL not set, allowing any CORS origin");
            CorsLayer::permissive()
        }
    }
}
