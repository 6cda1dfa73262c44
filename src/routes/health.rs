use axum::extract::State;
use axum::response::Json;
use serde_json::json;

use crate::server::AppState;

/// Health check endpoint handler.
///
/// Used by load balancers and uptime monitors; verifies the database
/// round trip as well as process liveness.
pub async fn ping(State(state): State<AppState>) -> Json<serde_json::Value> {
    let database = match state.db.health_check().await {
        Ok(()) => "ok",
        Err(err) => {
            tracing::error!("database health check failed: {:#}", err);
            "unavailable"
        }
    };
    Json(json!({ "status": "pong", "database": database }))
}
