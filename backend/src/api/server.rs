//! HTTP server for the analysis gateway.
//!
//! # API Endpoints
//!
//! | Method | Path                | Description                              |
//! |--------|---------------------|------------------------------------------|
//! | GET    | `/health`           | Health check and reasoner status         |
//! | GET    | `/domains`          | Registered analysis domains              |
//! | POST   | `/analyze`          | JSON body or multipart file upload       |
//! | POST   | `/ingest?domain=X`  | Run every row of a table through X       |
//! | GET    | `/artifacts`        | Artifact log, newest first (`?limit=N`)  |
//! | GET    | `/artifacts/stats`  | Artifact counts per domain               |
//! | POST   | `/artifacts/clear`  | Remove every artifact                    |
//! | GET    | `/logs`             | SSE stream of pipeline logs              |

use axum::{
    body::Bytes,
    extract::{
        multipart::MultipartRejection,
        rejection::QueryRejection,
        DefaultBodyLimit, FromRequest, Multipart, Query, Request, State,
    },
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::logs::LOG_BROADCASTER;
use super::types::{
    api_error, AnalyzeBody, ApiError, ClearResponse, HealthResponse, IngestQuery, ListQuery,
    ReasonerStatus,
};
use crate::artifacts::{ArtifactRecord, ArtifactStats};
use crate::context::AppContext;
use crate::dispatch::{AnalysisRequest, Envelope, Orchestrator};
use crate::error::{DispatchError, ServerError};
use crate::normalizer::Upload;
use crate::registry::DomainDescriptor;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

/// Build the router with all routes and layers.
pub fn build_router(context: &AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    let state = AppState {
        orchestrator: Arc::clone(&context.orchestrator),
    };

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/domains", get(list_domains))
        .route("/analyze", post(analyze))
        .route("/ingest", post(ingest))
        .route("/artifacts", get(list_artifacts))
        .route("/artifacts/stats", get(artifact_stats))
        .route("/artifacts/clear", post(clear_artifacts))
        .route("/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(context.config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(context: AppContext) -> Result<(), ServerError> {
    let port = context.config.port;
    let app = build_router(&context);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, reasoner = context.orchestrator.reasoner().name(), "gateway listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Health check endpoint
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let reasoner = state.orchestrator.reasoner();
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "gateway".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        reasoner: ReasonerStatus {
            name: reasoner.name().to_string(),
            available: reasoner.is_available(),
        },
    })
}

async fn list_domains(State(state): State<AppState>) -> Json<Vec<DomainDescriptor>> {
    Json(state.orchestrator.registry().list())
}

/// Analyze a JSON body or a multipart upload, depending on content type.
async fn analyze(State(state): State<AppState>, request: Request) -> Response {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    let parsed = if is_multipart {
        match Multipart::from_request(request, &state).await {
            Ok(multipart) => read_multipart(multipart).await,
            Err(e) => Err(DispatchError::InvalidInput(format!("Multipart error: {}", e))),
        }
    } else {
        read_json(request, &state).await
    };

    let envelope = match parsed {
        Ok(analysis) => state.orchestrator.handle(analysis).await,
        Err(e) => Envelope::from(e),
    };
    envelope.into_response()
}

async fn read_json(request: Request, state: &AppState) -> Result<AnalysisRequest, DispatchError> {
    let bytes = Bytes::from_request(request, state)
        .await
        .map_err(|e| DispatchError::InvalidInput(format!("Read error: {}", e)))?;

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(DispatchError::InvalidInput("Request body is empty".to_string()));
    }
    let body: AnalyzeBody = serde_json::from_slice(&bytes)
        .map_err(|e| DispatchError::InvalidInput(format!("Invalid JSON body: {}", e)))?;
    Ok(body.into_request())
}

/// Multipart form of an analysis request
#[derive(Default)]
struct UploadForm {
    upload: Option<Upload>,
    payload: Option<String>,
    domain: Option<String>,
    hint: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, DispatchError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| DispatchError::InvalidInput(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let media_type = field.content_type().map(|m| m.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| DispatchError::InvalidInput(format!("Read error: {}", e)))?;

                let mut upload = Upload::new(filename, bytes.to_vec());
                if let Some(media_type) = media_type {
                    upload = upload.with_media_type(media_type);
                }
                form.upload = Some(upload);
            }
            "payload" | "text" | "domain" | "hint" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| DispatchError::InvalidInput(format!("Read error: {}", e)))?;
                match name.as_str() {
                    "domain" => form.domain = Some(value),
                    "hint" => form.hint = Some(value),
                    _ => form.payload = Some(value),
                }
            }
            other => tracing::debug!(field = other, "ignoring multipart field"),
        }
    }

    Ok(form)
}

async fn read_multipart(multipart: Multipart) -> Result<AnalysisRequest, DispatchError> {
    let form = read_form(multipart).await?;
    let request = match (form.upload, form.payload) {
        (Some(upload), _) => AnalysisRequest::file(upload),
        (None, Some(text)) => AnalysisRequest::text(text),
        (None, None) => return Err(DispatchError::InvalidInput("No file provided".to_string())),
    };
    Ok(request.with_domain(form.domain).with_hint(form.hint))
}

/// Per-row table ingestion endpoint
async fn ingest(
    State(state): State<AppState>,
    query: Result<Query<IngestQuery>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let outcome = async {
        let Query(query) =
            query.map_err(|e| DispatchError::InvalidInput(format!("Invalid query: {}", e)))?;
        let multipart =
            multipart.map_err(|e| DispatchError::InvalidInput(format!("Multipart error: {}", e)))?;
        let domain = query
            .domain
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| DispatchError::InvalidInput("Missing domain".to_string()))?;
        let upload = read_form(multipart)
            .await?
            .upload
            .ok_or_else(|| DispatchError::InvalidInput("No file provided".to_string()))?;
        state.orchestrator.ingest_table(domain.trim(), upload).await
    }
    .await;

    match outcome {
        Ok(reply) => Envelope::from(reply),
        Err(e) => Envelope::from(e),
    }
    .into_response()
}

async fn list_artifacts(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<ArtifactRecord>>, ApiError> {
    let Query(query) = query
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("Invalid query: {}", e)))?;
    state
        .orchestrator
        .artifacts()
        .list(query.limit)
        .map(Json)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

async fn artifact_stats(State(state): State<AppState>) -> Result<Json<ArtifactStats>, ApiError> {
    state
        .orchestrator
        .artifacts()
        .stats()
        .map(Json)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

async fn clear_artifacts(State(state): State<AppState>) -> Result<Json<ClearResponse>, ApiError> {
    let removed = state
        .orchestrator
        .artifacts()
        .clear()
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(ClearResponse {
        success: true,
        removed,
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        // lagged receivers skip missed entries
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
