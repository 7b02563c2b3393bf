//! HTTP API for single-document question answering.
//!
//! The server holds at most one indexed document (a [`Session`]). Uploading a
//! new document builds a fresh session outside the session lock and swaps it
//! in; queries already running keep the `Arc` they started with. Uploads
//! are serialized, so the last one to arrive is the one left published.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/health` | Health check (returns version) |
//! | `POST`   | `/document` | Upload a document (raw body, `Content-Type` pdf or text) |
//! | `GET`    | `/document` | Info about the current document |
//! | `DELETE` | `/document` | Drop the current document |
//! | `POST`   | `/retrieve` | `{ "query", "top_k"? }` → ranked chunks |
//! | `POST`   | `/ask` | `{ "question", "top_k"? }` → answer plus chunks |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "no_document", "message": "no document has been uploaded" } }
//! ```
//!
//! Error codes: `bad_request` (400), `no_document` (404), `unprocessable` (422),
//! `internal` (500), `upstream` (502).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! clients.

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use docqa_core::embedding::Embedder;
use docqa_core::retrieve::ScoredChunk;
use docqa_core::session::{Session, SessionInfo};
use docqa_core::CoreError;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::answer::{create_answerer, AnswerGenerator};
use crate::config::Config;
use crate::extract::extract_text;
use crate::pipeline::{self, Answer, PipelineError};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    embedder: Arc<dyn Embedder>,
    answerer: Arc<dyn AnswerGenerator>,
    /// The current document, if any. Never held across an `.await`.
    session: Arc<RwLock<Option<Arc<Session>>>>,
    /// Held by an upload from extraction through publish, so documents are
    /// published in the order their uploads arrived.
    uploads: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(
        config: Config,
        embedder: Arc<dyn Embedder>,
        answerer: Arc<dyn AnswerGenerator>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            embedder,
            answerer,
            session: Arc::new(RwLock::new(None)),
            uploads: Arc::new(Mutex::new(())),
        }
    }

    fn current(&self) -> Result<Option<Arc<Session>>, AppError> {
        let guard = self
            .session
            .read()
            .map_err(|_| internal("session lock poisoned"))?;
        Ok(guard.clone())
    }

    fn require_session(&self) -> Result<Arc<Session>, AppError> {
        self.current()?.ok_or_else(no_document)
    }

    /// Replace the current session, returning the previous one.
    fn publish(&self, session: Option<Arc<Session>>) -> Result<Option<Arc<Session>>, AppError> {
        let mut guard = self
            .session
            .write()
            .map_err(|_| internal("session lock poisoned"))?;
        Ok(std::mem::replace(&mut *guard, session))
    }
}

/// Build the router with all routes, CORS, and the upload size limit.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let max_upload = state.config.server.max_upload_bytes;

    Router::new()
        .route("/health", get(handle_health))
        .route(
            "/document",
            post(handle_upload)
                .get(handle_get_document)
                .delete(handle_delete_document),
        )
        .route("/retrieve", post(handle_retrieve))
        .route("/ask", post(handle_ask))
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server.
///
/// Loads the embedding model once up front, then binds to `[server].bind`
/// and serves until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let embedder = pipeline::load_embedder(&config.embedding).await?;
    let answerer = create_answerer(&config.answer)?;

    info!(
        model = %embedder.model_name(),
        dims = embedder.dims(),
        answer_model = %answerer.model_name(),
        "models ready"
    );

    let app = router(AppState::new(config.clone(), embedder, answerer));

    println!("docqa server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`, `"no_document"`).
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(status = self.status.as_u16(), code = self.code, "{}", self.message);
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn app_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> AppError {
    AppError {
        status,
        code,
        message: message.into(),
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    app_error(StatusCode::BAD_REQUEST, "bad_request", message)
}

fn no_document() -> AppError {
    app_error(
        StatusCode::NOT_FOUND,
        "no_document",
        "no document has been uploaded",
    )
}

fn internal(message: impl Into<String>) -> AppError {
    app_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::Validation(_) | CoreError::EmptyInput(_) => bad_request(message),
            CoreError::EmptyIndex => app_error(StatusCode::NOT_FOUND, "no_document", message),
            CoreError::DegenerateVector { .. } | CoreError::DegenerateQuery => {
                app_error(StatusCode::UNPROCESSABLE_ENTITY, "unprocessable", message)
            }
            CoreError::DimensionMismatch { .. } => internal(message),
            CoreError::Embedding(_) => app_error(StatusCode::BAD_GATEWAY, "upstream", message),
        }
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Core(e) => e.into(),
            PipelineError::Extract(e) => {
                app_error(StatusCode::UNPROCESSABLE_ENTITY, "unprocessable", e.to_string())
            }
            PipelineError::Answer(e) => {
                app_error(StatusCode::BAD_GATEWAY, "upstream", e.to_string())
            }
            PipelineError::Task(e) => internal(e.to_string()),
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    /// The crate version from `Cargo.toml`.
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ /document ============

/// Handler for `POST /document`.
///
/// The body is the raw document; `Content-Type` selects the extractor and
/// defaults to `text/plain` when absent. The previous document stays
/// queryable until the new one is fully indexed. Concurrent uploads are
/// indexed one at a time, so the last upload to arrive is the one left
/// published.
async fn handle_upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<SessionInfo>, AppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .map(|v| {
            v.to_str()
                .map(str::to_string)
                .map_err(|_| bad_request("content-type header is not valid ASCII"))
        })
        .transpose()?
        .unwrap_or_else(|| crate::extract::MIME_TEXT.to_string());

    if body.is_empty() {
        return Err(bad_request("request body is empty"));
    }

    // tokio's mutex is fair, so waiting uploads run in arrival order.
    let _upload = state.uploads.lock().await;

    let bytes = body.len();
    let text = tokio::task::spawn_blocking(move || extract_text(&body, &content_type))
        .await
        .map_err(PipelineError::from)?
        .map_err(PipelineError::from)?;

    let options = state.config.session_options().map_err(|e| internal(e.to_string()))?;
    let session = pipeline::build_session(text, options, state.embedder.clone()).await?;
    let info = session.info();

    let previous = state.publish(Some(Arc::new(session)))?;
    info!(
        session_id = %info.session_id,
        bytes,
        replaced = previous.is_some(),
        "document published"
    );

    Ok(Json(info))
}

/// Handler for `GET /document`.
async fn handle_get_document(
    State(state): State<AppState>,
) -> Result<Json<SessionInfo>, AppError> {
    Ok(Json(state.require_session()?.info()))
}

#[derive(Serialize)]
struct DeleteResponse {
    deleted: bool,
}

/// Handler for `DELETE /document`. Deleting when nothing is loaded is not an error.
async fn handle_delete_document(
    State(state): State<AppState>,
) -> Result<Json<DeleteResponse>, AppError> {
    let previous = state.publish(None)?;
    Ok(Json(DeleteResponse {
        deleted: previous.is_some(),
    }))
}

// ============ POST /retrieve ============

#[derive(Deserialize)]
struct RetrieveRequest {
    query: String,
    /// Defaults to `[retrieval].top_k`.
    top_k: Option<usize>,
}

#[derive(Serialize)]
struct RetrieveResponse {
    results: Vec<ScoredChunk>,
}

async fn handle_retrieve(
    State(state): State<AppState>,
    Json(req): Json<RetrieveRequest>,
) -> Result<Json<RetrieveResponse>, AppError> {
    let session = state.require_session()?;
    let top_k = req.top_k.unwrap_or(state.config.retrieval.top_k);
    let results = pipeline::retrieve(session, req.query, top_k).await?;
    Ok(Json(RetrieveResponse { results }))
}

// ============ POST /ask ============

#[derive(Deserialize)]
struct AskRequest {
    question: String,
    top_k: Option<usize>,
}

async fn handle_ask(
    State(state): State<AppState>,
    Json(req): Json<AskRequest>,
) -> Result<Json<Answer>, AppError> {
    let session = state.require_session()?;
    let top_k = req.top_k.unwrap_or(state.config.retrieval.top_k);
    let answer = pipeline::ask(session, state.answerer.as_ref(), &req.question, top_k).await?;
    Ok(Json(answer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ExtractError;

    #[test]
    fn test_core_error_mapping() {
        let cases = [
            (CoreError::Validation("x".into()), 400, "bad_request"),
            (CoreError::EmptyInput("x".into()), 400, "bad_request"),
            (CoreError::EmptyIndex, 404, "no_document"),
            (
                CoreError::DegenerateVector { chunk_index: 2 },
                422,
                "unprocessable",
            ),
            (CoreError::DegenerateQuery, 422, "unprocessable"),
            (
                CoreError::DimensionMismatch {
                    expected: 4,
                    actual: 3,
                },
                500,
                "internal",
            ),
            (CoreError::Embedding("down".into()), 502, "upstream"),
        ];
        for (err, status, code) in cases {
            let app: AppError = err.into();
            assert_eq!(app.status.as_u16(), status);
            assert_eq!(app.code, code);
        }
    }

    #[test]
    fn test_pipeline_error_mapping() {
        let app: AppError =
            PipelineError::Extract(ExtractError::UnsupportedContentType("image/png".into())).into();
        assert_eq!(app.status, StatusCode::UNPROCESSABLE_ENTITY);

        let app: AppError = PipelineError::Answer(crate::answer::AnswerError::Disabled).into();
        assert_eq!(app.status, StatusCode::BAD_GATEWAY);
        assert_eq!(app.code, "upstream");
    }
}
