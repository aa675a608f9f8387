//! HTTP API for the Altar service.
//!
//! This module provides:
//! - Health and provider status
//! - Wedding-planning AI endpoints, per provider
//! - The collaboration relay socket

use axum::{
    Json, Router,
    extract::{Query, State, WebSocketUpgrade},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::ai::{AiClient, DeepSeek, Gemini, ProviderStatus};
use crate::config::AppConfig;
use crate::error::{I18nError, ServiceError, ServiceResult};
use crate::i18n::I18n;
use crate::websocket::{CollaborationQuery, RelayManager, handle_ws_connection};

pub mod ai;
use ai::{chat_handler, image_analysis_handler, story_handler, test_handler, vision_board_handler};

/// Application state
pub struct AppState {
    pub gemini: AiClient<Gemini>,
    pub deepseek: AiClient<DeepSeek>,
    pub relay: Arc<RelayManager>,
    pub i18n: Arc<I18n>,
    pub start_time: Instant,
}

impl AppState {
    /// Build provider clients and the relay from configuration
    pub fn new(config: &AppConfig) -> ServiceResult<Self> {
        Ok(Self {
            gemini: AiClient::new(Gemini, &config.ai.gemini, &config.ai.retry)?,
            deepseek: AiClient::new(DeepSeek, &config.ai.deepseek, &config.ai.retry)?,
            relay: Arc::new(RelayManager::new()),
            i18n: Arc::new(I18n::new()),
            start_time: Instant::now(),
        })
    }

    /// Create an i18n-aware error from a service error
    pub fn i18n_error(&self, error: ServiceError) -> I18nError {
        I18nError::new(error, self.i18n.clone(), "en")
    }
}

/// Build the API router
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let ai_routes = Router::new()
        .route("/{provider}/story", post(story_handler))
        .route("/{provider}/vision-board", post(vision_board_handler))
        .route("/{provider}/image-analysis", post(image_analysis_handler))
        .route("/{provider}/chat", post(chat_handler))
        .route("/{provider}/test", post(test_handler));

    Router::new()
        .route("/health", get(health_handler))
        .route("/collaboration", get(collaboration_handler))
        .nest("/api/ai", ai_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// === Health ===

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let providers = vec![state.gemini.status(), state.deepseek.status()];
    let any_ready = providers.iter().any(|p| p.initialized);

    let status = if any_ready {
        state.i18n.get("en", "health-status-healthy", None)
    } else {
        state.i18n.format(
            "en",
            "health-status-degraded",
            &[("reason", "no AI provider configured")],
        )
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        providers,
        collaboration_connections: state.relay.connection_count(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    uptime_seconds: u64,
    providers: Vec<ProviderStatus>,
    collaboration_connections: usize,
}

// === Collaboration relay ===

async fn collaboration_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<CollaborationQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    info!(project_id = %query.project_id, "Collaboration upgrade request received");
    let relay = state.relay.clone();
    ws.on_upgrade(move |socket| handle_ws_connection(socket, relay, query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaboration::{EventKind, SessionEvent, SessionManager, WsConnector};
    use crate::config::CollaborationConfig;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use std::sync::Mutex;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_state() -> Arc<AppState> {
        Arc::new(AppState::new(&AppConfig::default()).unwrap())
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_health_reports_unconfigured_providers() {
        let app = router(test_state());
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(
            body["status"],
            "Service is degraded: no AI provider configured"
        );
        assert_eq!(body["providers"][0]["provider"], "Gemini");
        assert_eq!(body["providers"][0]["initialized"], false);
        assert_eq!(body["providers"][1]["provider"], "DeepSeek");
        assert_eq!(body["collaboration_connections"], 0);
    }

    #[tokio::test]
    async fn test_unknown_provider_is_not_found() {
        let app = router(test_state());
        let response = app
            .oneshot(post_json(
                "/api/ai/openai/image-analysis",
                json!({ "description": "Lace gown in a garden" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["code"], "unknown_provider");
        assert_eq!(body["message"], "Unknown AI provider: openai");
    }

    #[tokio::test]
    async fn test_uninitialized_provider_is_unavailable() {
        let app = router(test_state());
        let response = app
            .oneshot(post_json(
                "/api/ai/gemini/story",
                json!({ "names": "Ana & Luis", "style": "romantic" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["code"], "ai_not_initialized");
        assert_eq!(body["message"], "Gemini API not properly initialized");
        assert_eq!(body["details"]["provider"], "Gemini");
        assert_eq!(body["details"]["kind"], "not_initialized");
    }

    #[tokio::test]
    async fn test_blank_chat_message_is_rejected() {
        let app = router(test_state());
        let response = app
            .oneshot(post_json("/api/ai/deepseek/chat", json!({ "message": "   " })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "invalid_request");
    }

    #[tokio::test]
    async fn test_story_through_mock_provider() {
        let mock = Router::new().route(
            "/chat/completions",
            post(|| async {
                Json(json!({
                    "choices": [{ "message": { "content": "{\"story\":\"They met at a bakery.\",\"wordCount\":5}" } }],
                    "usage": { "prompt_tokens": 40, "completion_tokens": 12, "total_tokens": 52 }
                }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, mock).await });

        let mut config = AppConfig::default();
        config.ai.deepseek.api_key = Some("sk-live-test".to_string());
        config.ai.deepseek.base_url = Some(format!("http://{}", addr));
        let app = router(Arc::new(AppState::new(&config).unwrap()));

        let response = app
            .oneshot(post_json(
                "/api/ai/deepseek/story",
                json!({ "names": "Ana & Luis", "style": "casual", "venue": "Orchard" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["payload"]["story"], "They met at a bakery.");
        assert_eq!(body["usage"]["total_tokens"], 52);
    }

    #[tokio::test]
    async fn test_sessions_talk_through_relay() {
        let state = test_state();
        let app = router(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });

        let config = CollaborationConfig {
            host: addr.to_string(),
            ..Default::default()
        };
        let ana = SessionManager::new(config.clone(), Arc::new(WsConnector));
        let luis = SessionManager::new(config, Arc::new(WsConnector));
        ana.set_user_name("Ana");
        luis.set_user_name("Luis");

        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        luis.on(
            EventKind::ItemUpdated,
            Arc::new(move |event: &SessionEvent| {
                if let SessionEvent::Update(update) = event {
                    sink.lock().unwrap().push(update.clone());
                }
            }),
        );

        ana.connect("ana", "wedding 1");
        wait_until(|| state.relay.connection_count() == 1).await;
        luis.connect("luis", "wedding 1");
        wait_until(|| state.relay.project_connection_count("wedding 1") == 2).await;

        // Each side learns about the other through user_joined
        wait_until(|| luis.active_users().iter().any(|u| u.user_id == "ana")).await;
        wait_until(|| ana.active_users().iter().any(|u| u.user_id == "luis")).await;

        assert!(ana.send_update(EventKind::ItemUpdated, json!({ "itemId": "cake" })));
        wait_until(|| !received.lock().unwrap().is_empty()).await;

        let update = received.lock().unwrap()[0].clone();
        assert_eq!(update.user_id, "ana");
        assert_eq!(update.user_name, "Ana");
        assert_eq!(update.data["itemId"], "cake");

        ana.disconnect();
        wait_until(|| state.relay.connection_count() == 1).await;
        wait_until(|| !luis.active_users().iter().any(|u| u.user_id == "ana")).await;
        luis.disconnect();
    }
}
