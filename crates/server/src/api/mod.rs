//! # HTTP API
//!
//! All routes live under `/api/v1`:
//!
//! - `POST /chat` - run a petition, streamed as server-sent events
//! - `GET /scenarios`, `GET /agents` - catalogs for the client
//! - `POST /mock/gov` - call a mock government service directly
//! - `GET|PATCH /config` - persisted settings
//! - `GET /openapi.json`

use std::path::PathBuf;
use std::sync::Arc;

use allpass_core::error::AgentError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use thiserror::Error;
use utoipa::OpenApi;

pub mod catalog;
pub mod chat;
pub mod gov;
pub mod settings;

/// Shared handler state
pub struct AppState {
    /// Where the persisted config lives
    pub config_path: PathBuf,
}

pub type SharedState = Arc<AppState>;

/// Errors surfaced to HTTP clients as `{"error": "..."}`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Upstream(#[from] AgentError),

    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(AgentError::Upstream { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Upstream(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "All-Pass API",
        version = "1.0.0",
        description = "One-stop civil petition processing by a swarm of agents"
    ),
    paths(
        chat::chat,
        catalog::list_scenarios,
        catalog::list_agents,
        gov::call_gov_api,
        settings::get_config,
        settings::update_config
    ),
    components(schemas(
        chat::ChatRequest,
        gov::GovApiRequest,
        gov::GovApiReply,
        crate::config::PersistedConfig,
        crate::config::ConfigDefaults,
        crate::config::ConfigResponse
    )),
    tags(
        (name = "chat", description = "Petition runs"),
        (name = "catalog", description = "Scenarios and agents"),
        (name = "mock", description = "Mock government services"),
        (name = "config", description = "Configuration management")
    )
)]
pub struct ApiDoc;

async fn serve_openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/v1/chat", post(chat::chat))
        .route("/api/v1/scenarios", get(catalog::list_scenarios))
        .route("/api/v1/agents", get(catalog::list_agents))
        .route("/api/v1/mock/gov", post(gov::call_gov_api))
        .route(
            "/api/v1/config",
            get(settings::get_config).patch(settings::update_config),
        )
        .route("/api/v1/openapi.json", get(serve_openapi))
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    /// Router over a fresh config file with simulated latency switched off
    pub async fn instant_router(name: &str) -> Router {
        let path = std::env::temp_dir()
            .join(format!("allpass-{}-{}", name, std::process::id()))
            .join("config.json");
        crate::config::PersistedConfig {
            latency_min_ms: Some(0),
            latency_max_ms: Some(0),
            ..Default::default()
        }
        .save(&path)
        .await
        .unwrap();
        router(Arc::new(AppState { config_path: path }))
    }

    pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, String) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    pub fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_openapi_lists_routes() {
        let app = instant_router("openapi").await;
        let (status, body) = send(app, get("/api/v1/openapi.json")).await;
        assert_eq!(status, StatusCode::OK);
        let doc: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert!(doc["paths"]["/api/v1/chat"].is_object());
        assert!(doc["paths"]["/api/v1/mock/gov"].is_object());
    }
}
