//! Config handlers

use axum::{extract::State, Json};

use super::{ApiError, SharedState};
use crate::config::{ConfigDefaults, ConfigResponse, PersistedConfig};

/// Get current configuration
#[utoipa::path(
    get,
    path = "/api/v1/config",
    tag = "config",
    responses(
        (status = 200, description = "Current configuration and defaults", body = ConfigResponse)
    )
)]
pub async fn get_config(State(state): State<SharedState>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        config: PersistedConfig::load(&state.config_path).await,
        defaults: ConfigDefaults::default(),
    })
}

/// Update configuration (partial merge)
#[utoipa::path(
    patch,
    path = "/api/v1/config",
    tag = "config",
    request_body = PersistedConfig,
    responses(
        (status = 200, description = "Updated configuration", body = ConfigResponse)
    )
)]
pub async fn update_config(
    State(state): State<SharedState>,
    Json(updates): Json<PersistedConfig>,
) -> Result<Json<ConfigResponse>, ApiError> {
    let mut config = PersistedConfig::load(&state.config_path).await;
    config.merge(updates);
    config.save(&state.config_path).await?;
    tracing::info!(path = %state.config_path.display(), "config updated");

    Ok(Json(ConfigResponse {
        config,
        defaults: ConfigDefaults::default(),
    }))
}
