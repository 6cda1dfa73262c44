//! # Server Module
//!
//! HTTP server setup and route configuration for the recipes server.

use axum::http::HeaderValue;
use axum::{Router, middleware, routing::{get, post}};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::auth::magic_link::MagicLinkService;
use crate::auth::middleware::require_user;
use crate::auth::nonce::NonceRegistry;
use crate::auth::session::SessionStorage;
use crate::config::CONFIG;
use crate::database::{DatabaseConfig, DatabaseConnection, migrations};
use crate::routes;

/// Application state shared across all route handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub magic_links: Arc<MagicLinkService>,
    pub sessions: Arc<SessionStorage>,
    pub nonces: Arc<NonceRegistry>,
}

/// Starts the recipes HTTP server.
///
/// Loads configuration, connects to the database, applies migrations,
/// then serves until the process is terminated. Configuration problems
/// are fatal here; the process must not serve traffic half-configured.
pub async fn start() {
    let config = &*CONFIG;

    // Initialize database connection and bring the schema up to date
    let db_config = DatabaseConfig::from_url(&config.database.url)
        .expect("Failed to parse DATABASE_URL");
    let db = Arc::new(
        DatabaseConnection::new(db_config)
            .await
            .expect("Failed to connect to database"),
    );
    migrations::run_migrations(db.pool())
        .await
        .expect("Failed to run database migrations");

    let app_state = AppState {
        db,
        magic_links: Arc::new(MagicLinkService::new(
            &config.magic_link_secret,
            config.origin.clone(),
        )),
        sessions: Arc::new(SessionStorage::new(&config.session_secret)),
        nonces: Arc::new(NonceRegistry::new()),
    };

    // Everything past login requires an authenticated session
    let protected_routes = Router::new()
        .route("/api/auth/me", get(routes::auth::me))
        .route("/api/auth/complete-signup", post(routes::auth::complete_signup))
        .merge(routes::pantry::create_pantry_routes())
        .merge(routes::recipes::create_recipe_routes())
        .merge(routes::grocery::create_grocery_routes())
        .layer(middleware::from_fn_with_state(app_state.clone(), require_user));

    let allowed_origin = config
        .origin
        .origin()
        .ascii_serialization()
        .parse::<HeaderValue>()
        .expect("ORIGIN is not a valid header value");

    let app = Router::new()
        .route("/ping", get(routes::health::ping))
        .merge(routes::auth::create_auth_routes())
        .merge(protected_routes)
        .layer(
            ServiceBuilder::new().layer(
                CorsLayer::new()
                    .allow_origin(allowed_origin)
                    .allow_methods([
                        axum::http::Method::GET,
                        axum::http::Method::POST,
                        axum::http::Method::PUT,
                        axum::http::Method::DELETE,
                        axum::http::Method::OPTIONS,
                    ])
                    .allow_headers([
                        axum::http::header::ORIGIN,
                        axum::http::header::CONTENT_TYPE,
                        axum::http::header::ACCEPT,
                    ])
                    .allow_credentials(true),
            ),
        )
        .with_state(app_state);

    // Use $PORT if set (PaaS convention), otherwise the configured port
    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(config.server.port);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address - port may already be in use");

    tracing::info!("Listening on http://{}", addr);
    tracing::info!("Health check available at http://{}/ping", addr);
    tracing::info!("Magic link verification served at {}/validate-magic-link", config.origin);

    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}
