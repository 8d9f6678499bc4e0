//! # Chat API
//!
//! `POST /api/v1/chat` validates the petition, starts the orchestrator in
//! the background and streams its events as SSE `data:` lines until the
//! run closes the channel.

use allpass_core::skills::ScenarioId;
use allpass_core::swarm::{EventChannel, Orchestrator, RunRequest};
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{Stream, StreamExt};
use serde::Deserialize;
use tokio_stream::wrappers::UnboundedReceiverStream;
use utoipa::ToSchema;

use super::{ApiError, SharedState};
use crate::config::PersistedConfig;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    /// `restaurant`, `relocation` or `welfare`
    pub scenario_id: Option<String>,
}

impl ChatRequest {
    fn into_run_request(self) -> Result<RunRequest, ApiError> {
        let message = self.message.trim();
        if message.is_empty() {
            return Err(ApiError::BadRequest("message is required".into()));
        }
        let scenario = match self.scenario_id.as_deref().filter(|s| !s.is_empty()) {
            Some(id) => Some(
                ScenarioId::parse(id)
                    .ok_or_else(|| ApiError::BadRequest(format!("unknown scenarioId: {}", id)))?,
            ),
            None => None,
        };
        Ok(RunRequest::new(message).with_scenario(scenario))
    }
}

/// Run a petition and stream its events
#[utoipa::path(
    post,
    path = "/api/v1/chat",
    tag = "chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Event stream (text/event-stream)"),
        (status = 400, description = "Missing message or unknown scenario")
    )
)]
pub async fn chat(
    State(state): State<SharedState>,
    Json(req): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let request = req.into_run_request()?;
    let config = PersistedConfig::load(&state.config_path)
        .await
        .to_orchestrator_config();

    let (channel, events) = EventChannel::new();
    tracing::info!(scenario = ?request.scenario, live = config.model.is_live(), "chat run accepted");
    tokio::spawn(Orchestrator::new(config, channel).run(request));

    let stream = UnboundedReceiverStream::new(events.into_inner())
        .map(|event| Event::default().json_data(&event));
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    fn data_lines(body: &str) -> Vec<Value> {
        body.lines()
            .filter_map(|l| l.strip_prefix("data: "))
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected() {
        let app = instant_router("chat-empty").await;
        let (status, body) = send(app, post_json("/api/v1/chat", json!({"message": "   "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("message is required"));
    }

    #[tokio::test]
    async fn test_unknown_scenario_is_rejected() {
        let app = instant_router("chat-scenario").await;
        let (status, _) = send(
            app,
            post_json("/api/v1/chat", json!({"message": "hi", "scenarioId": "taxes"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_stream_ends_with_complete() {
        let app = instant_router("chat-stream").await;
        let (status, body) = send(
            app,
            post_json(
                "/api/v1/chat",
                json!({"message": "I was laid off", "scenarioId": "welfare"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let events = data_lines(&body);
        assert_eq!(events[0]["type"], "workflow_state");
        assert_eq!(events[0]["data"]["state"], "INIT");
        assert_eq!(events.last().unwrap()["type"], "complete");
        assert!(events.iter().any(|e| e["type"] == "dag_update"));
        assert_eq!(
            events.iter().filter(|e| e["type"] == "complete").count(),
            1
        );
    }
}
