//! Direct access to the mock government services

use allpass_core::tools::{ApiKind, GovApi};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::{ApiError, SharedState};
use crate::config::PersistedConfig;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GovApiRequest {
    /// e.g. `building_registry`, `welfare_benefits`
    pub api_type: Option<String>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub params: Value,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GovApiReply {
    pub success: bool,
    pub api_type: String,
    /// Milliseconds
    pub response_time: u64,
    #[schema(value_type = Object)]
    pub data: Value,
    /// RFC 3339
    pub timestamp: String,
}

/// Call one mock service
#[utoipa::path(
    post,
    path = "/api/v1/mock/gov",
    tag = "mock",
    request_body = GovApiRequest,
    responses(
        (status = 200, description = "Service response", body = GovApiReply),
        (status = 400, description = "Missing or unknown apiType"),
        (status = 503, description = "Injected service failure")
    )
)]
pub async fn call_gov_api(
    State(state): State<SharedState>,
    Json(req): Json<GovApiRequest>,
) -> Result<Json<GovApiReply>, ApiError> {
    let name = req
        .api_type
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::BadRequest("apiType is required".into()))?;
    let kind = ApiKind::parse(&name)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown apiType: {}", name)))?;

    let profile = PersistedConfig::load(&state.config_path)
        .await
        .to_orchestrator_config()
        .simulation;
    let response = GovApi::new(profile).call(kind, &req.params).await?;

    Ok(Json(GovApiReply {
        success: true,
        api_type: kind.as_str().to_string(),
        response_time: response.response_time,
        data: response.data,
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_known_service() {
        let app = instant_router("gov-ok").await;
        let (status, body) = send(
            app,
            post_json("/api/v1/mock/gov", json!({"apiType": "welfare_benefits"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let reply: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(reply["success"], true);
        assert_eq!(reply["apiType"], "welfare_benefits");
        assert!(reply["data"]["benefits"].is_array());
    }

    #[tokio::test]
    async fn test_missing_api_type() {
        let app = instant_router("gov-missing").await;
        let (status, body) = send(app, post_json("/api/v1/mock/gov", json!({"params": {}}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("apiType is required"));
    }
}
