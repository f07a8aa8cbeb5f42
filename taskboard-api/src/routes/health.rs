/// Health check endpoint
///
/// Reports whether the server is running, whether the database answers, and
/// whether the schema is at the bundled migration version.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected",
///   "schema_up_to_date": true
/// }
/// ```
///
/// The endpoint always answers `200`; a failing database shows up as
/// `"status": "degraded"`.

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use taskboard_shared::db::{migrations::migration_status, pool::health_check as ping_database};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Application version
    pub version: String,

    /// Database status
    pub database: String,

    /// Whether all bundled migrations are applied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_up_to_date: Option<bool>,
}

/// Health check handler
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let connected = match ping_database(&state.db).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not reach the database");
            false
        }
    };

    let schema_up_to_date = if connected {
        migration_status(&state.db)
            .await
            .ok()
            .map(|status| status.is_up_to_date)
    } else {
        None
    };

    Ok(Json(HealthResponse {
        status: if connected { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if connected { "connected" } else { "disconnected" }.to_string(),
        schema_up_to_date,
    }))
}
