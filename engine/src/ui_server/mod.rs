//! Browser chat host
//!
//! Serves the "Codify - Your Coding Partner" page and the JSON/SSE endpoints
//! behind it. The host owns exactly one chat session; its mutex is held for
//! the whole of an interaction, so requests are handled one at a time.
//!
//! # Endpoints
//!
//! - GET /                    - Chat page
//! - GET /api/session         - Current session snapshot
//! - POST /api/settings       - Tracing key source, manual key, project, backend
//! - POST /api/chat           - Submit a prompt; answers with an event stream
//! - POST /api/feedback       - Rate the latest response
//! - POST /api/feedback-style - Switch between thumbs and faces
//! - POST /api/clear          - Clear message history
//! - GET /api/status          - Liveness and version

use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream};
use sdk::errors::{CodifyError, CodifyErrorExt};
use sdk::types::{Backend, FeedbackStyle, RunId};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tower_http::trace::TraceLayer;

use crate::chat::display::{ChannelSurface, DisplayEvent};
use crate::chat::{ChatOrchestrator, EventLog, FeedbackInput, FeedbackOutcome, SessionContext};
use crate::secrets::{SecretManager, SecretString};

const INDEX_HTML: &str = include_str!("index.html");

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ChatOrchestrator>,
    pub session: Arc<Mutex<SessionContext>>,
    scrubber: Arc<SecretManager>,
}

impl AppState {
    pub fn new(orchestrator: Arc<ChatOrchestrator>, session: SessionContext) -> Self {
        Self {
            orchestrator,
            session: Arc::new(Mutex::new(session)),
            scrubber: Arc::new(SecretManager::default()),
        }
    }

    /// Error text safe to show in the page
    fn describe(&self, error: &CodifyError) -> String {
        self.scrubber
            .scrub(&format!("{} ({})", error, error.user_hint()))
    }
}

#[derive(Debug, Deserialize)]
struct SettingsRequest {
    use_demo_key: Option<bool>,
    api_key: Option<String>,
    project_name: Option<String>,
    backend: Option<Backend>,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    prompt: String,
    backend: Option<Backend>,
}

#[derive(Debug, Deserialize)]
struct FeedbackRequest {
    run_id: String,
    score: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StyleRequest {
    /// Explicit style; flips the current one when absent
    style: Option<FeedbackStyle>,
}

#[derive(Debug, Serialize)]
struct FeedbackResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    feedback_id: Option<String>,
}

/// Build the router for a host state
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/session", get(session_handler))
        .route("/api/settings", post(settings_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/feedback", post(feedback_handler))
        .route("/api/feedback-style", post(feedback_style_handler))
        .route("/api/clear", post(clear_handler))
        .route("/api/status", get(status_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until Ctrl-C
pub async fn serve(state: AppState, addr: SocketAddr) -> Result<(), CodifyError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| CodifyError::Network(format!("Failed to bind to {}: {}", addr, e)))?;

    let local = listener
        .local_addr()
        .map_err(|e| CodifyError::Network(format!("Failed to get local address: {}", e)))?;
    tracing::info!("Codify listening on http://{}", local);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Codify shutting down gracefully");
        })
        .await
        .map_err(|e| CodifyError::Network(format!("Server error: {}", e)))
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn session_handler(State(state): State<AppState>) -> Response {
    let session = state.session.lock().await;
    Json(session.snapshot()).into_response()
}

async fn settings_handler(
    State(state): State<AppState>,
    Json(req): Json<SettingsRequest>,
) -> Response {
    let mut session = state.session.lock().await;

    if let Some(use_demo_key) = req.use_demo_key {
        session.settings.use_demo_key = use_demo_key;
    }
    if let Some(key) = req.api_key {
        session.settings.manual_api_key = Some(SecretString::new(key.trim()));
    }
    if let Some(project) = req.project_name {
        session.settings.project_name = project.trim().to_string();
    }
    if let Some(backend) = req.backend {
        session.backend = backend;
    }

    Json(session.snapshot()).into_response()
}

async fn chat_handler(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut session = state.session.lock().await;
        let backend = req.backend.unwrap_or(session.backend);
        let mut surface = ChannelSurface::new(tx);

        if let Err(e) = state
            .orchestrator
            .submit(&mut session, &req.prompt, backend, &mut surface)
            .await
        {
            surface.send(DisplayEvent::Error {
                message: state.describe(&e),
            });
        }
        surface.send(DisplayEvent::Done);
    });

    let events = stream::unfold(rx, |mut rx| async move {
        let event = rx.recv().await;
        event.map(|event| (Event::default().json_data(&event), rx))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

async fn feedback_handler(
    State(state): State<AppState>,
    Json(req): Json<FeedbackRequest>,
) -> Response {
    let run_id: RunId = match req.run_id.parse() {
        Ok(id) => id,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "Invalid run id"})),
            )
                .into_response();
        }
    };

    let input = FeedbackInput {
        score: req.score,
        text: req.text,
    };

    let mut session = state.session.lock().await;
    let mut surface = EventLog::new();

    match state
        .orchestrator
        .submit_feedback(&mut session, run_id, input, &mut surface)
        .await
    {
        Ok(FeedbackOutcome::Recorded(record)) => Json(FeedbackResponse {
            status: "recorded",
            message: None,
            feedback_id: Some(record.id),
        })
        .into_response(),
        Ok(FeedbackOutcome::Rejected(message)) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(FeedbackResponse {
                status: "rejected",
                message: Some(message),
                feedback_id: None,
            }),
        )
            .into_response(),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({"error": state.describe(&e)})),
        )
            .into_response(),
    }
}

async fn feedback_style_handler(
    State(state): State<AppState>,
    body: Option<Json<StyleRequest>>,
) -> Response {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let mut session = state.session.lock().await;

    let style = req
        .style
        .unwrap_or_else(|| session.feedback_style.toggled());
    session.feedback_style = style;

    Json(session.snapshot()).into_response()
}

async fn clear_handler(State(state): State<AppState>) -> Response {
    let mut session = state.session.lock().await;
    state.orchestrator.clear_history(&mut session);
    Json(session.snapshot()).into_response()
}

async fn status_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "running",
        "version": env!("CARGO_PKG_VERSION"),
        "commit": env!("GIT_COMMIT_HASH"),
    }))
}
