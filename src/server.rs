//! HTTP surface: report ingestion and artifact retrieval.
//!
//! | Method | Path                           | Response                        |
//! |--------|--------------------------------|---------------------------------|
//! | POST   | `/api/report`                  | the sealed dossier (PDF)        |
//! | GET    | `/evidence/:case_id`           | JSON list of the case artifacts |
//! | GET    | `/evidence/:case_id/:file`     | one artifact                    |
//! | GET    | `/health`                      | `{status, version}`             |
//!
//! Errors are JSON: `{"error": {"code": "...", "message": "..."}}`. Storage
//! and render failures map to 500 with a generic message; the details only
//! go to the log.

use crate::config::{DossierConfig, ServerConfig};
use crate::error::DossierError;
use crate::ingest::ingest;
use crate::report::{Report, SubmissionContext};
use crate::store::{ArtifactEntry, CaseStore};
use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, DefaultBodyLimit, Path, State};
use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Response header carrying the id of the case a report was filed under.
pub const CASE_ID_HEADER: HeaderName = HeaderName::from_static("x-case-id");

const FORWARDED_FOR: &str = "x-forwarded-for";
const UNKNOWN_CLIENT: &str = "unknown";

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<CaseStore>,
    pub config: Arc<DossierConfig>,
}

impl AppState {
    pub fn new(store: CaseStore, config: DossierConfig) -> Self {
        Self {
            store: Arc::new(store),
            config: Arc::new(config),
        }
    }
}

/// Build the application router.
pub fn router(state: AppState, server: &ServerConfig) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/api/report", post(submit_report))
        .route("/evidence/:case_id", get(list_case))
        .route("/evidence/:case_id/:file_name", get(fetch_artifact))
        .with_state(state)
        .layer(DefaultBodyLimit::max(server.max_body_bytes));

    if server.permissive_cors {
        app = app.layer(CorsLayer::permissive());
    }
    app.layer(TraceLayer::new_for_http())
}

/// Open the store, bind the listener and serve until Ctrl-C.
pub async fn serve(server: ServerConfig, config: DossierConfig) -> Result<(), DossierError> {
    let store = CaseStore::open(&config.storage_root).await?;
    let app = router(AppState::new(store, config), &server);

    let listener = tokio::net::TcpListener::bind(server.bind_addr)
        .await
        .map_err(|e| DossierError::BindFailed {
            addr: server.bind_addr,
            source: e,
        })?;
    info!("Listening on {}", server.bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| DossierError::Internal(format!("server error: {e}")))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install Ctrl-C handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

// ── Handlers ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn submit_report(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    payload: Result<Json<Report>, JsonRejection>,
) -> Result<Response, ApiError> {
    let context = SubmissionContext::now(client_addr(&headers, peer.map(|c| c.0)));
    let Json(report) = payload.map_err(|rejection| {
        warn!("Rejected report from {}: {}", context.client_addr, rejection);
        ApiError::new(rejection.status(), "ERR_INVALID_REPORT", rejection.body_text())
    })?;

    let output = ingest(report, context, &state.store, &state.config).await?;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/pdf"),
    );
    response_headers.insert(
        header::CONTENT_DISPOSITION,
        header_value(&format!(
            "inline; filename=\"{}\"",
            state.config.response_filename
        ))?,
    );
    response_headers.insert(CASE_ID_HEADER, header_value(&output.case_id)?);

    Ok((response_headers, output.dossier).into_response())
}

#[derive(Debug, Serialize)]
struct CaseListing {
    case_id: String,
    artifacts: Vec<ArtifactEntry>,
}

async fn list_case(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
) -> Result<Json<CaseListing>, ApiError> {
    let artifacts = state.store.list(&case_id).await?;
    Ok(Json(CaseListing { case_id, artifacts }))
}

async fn fetch_artifact(
    State(state): State<AppState>,
    Path((case_id, file_name)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let bytes = state.store.read(&case_id, &file_name).await?;
    Ok((
        [(header::CONTENT_TYPE, content_type_for(&file_name))],
        bytes,
    )
        .into_response())
}

// ── Helpers ──────────────────────────────────────────────────────────────

/// First `X-Forwarded-For` entry, else the peer IP, else `"unknown"`.
pub fn client_addr(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get(FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Content type for an artifact, by extension.
pub fn content_type_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webm") => "video/webm",
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("ogv") => "video/ogg",
        _ => "application/octet-stream",
    }
}

fn header_value(value: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(value).map_err(|e| {
        error!("Unrepresentable header value {:?}: {}", value, e);
        ApiError::internal()
    })
}

// ── Errors ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

/// An error rendered as a JSON response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "ERR_INTERNAL",
            "failed to process evidence",
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<DossierError> for ApiError {
    fn from(e: DossierError) -> Self {
        match e {
            DossierError::InvalidPathSegment { .. } => {
                Self::new(StatusCode::BAD_REQUEST, "ERR_INVALID_PATH", e.to_string())
            }
            DossierError::ArtifactNotFound { .. } | DossierError::CaseNotFound { .. } => {
                Self::new(StatusCode::NOT_FOUND, "ERR_NOT_FOUND", e.to_string())
            }
            other => {
                error!("Request failed: {}", other);
                Self::internal()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: ErrorDetail {
                    code: self.code,
                    message: self.message,
                },
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn forwarded_for_wins_over_peer() {
        let mut headers = HeaderMap::new();
        headers.insert(
            FORWARDED_FOR,
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        let peer = Some(SocketAddr::from(([127, 0, 0, 1], 5000)));
        assert_eq!(client_addr(&headers, peer), "203.0.113.7");
    }

    #[test]
    fn peer_then_unknown() {
        let headers = HeaderMap::new();
        let peer = Some(SocketAddr::from(([192, 0, 2, 1], 5000)));
        assert_eq!(client_addr(&headers, peer), "192.0.2.1");
        assert_eq!(client_addr(&headers, None), "unknown");

        let mut blank = HeaderMap::new();
        blank.insert(FORWARDED_FOR, HeaderValue::from_static(" "));
        assert_eq!(client_addr(&blank, None), "unknown");
    }

    #[test]
    fn content_types() {
        assert_eq!(content_type_for("dossier.pdf"), "application/pdf");
        assert_eq!(content_type_for("evidence_1.jpg"), "image/jpeg");
        assert_eq!(content_type_for("evidence_video.webm"), "video/webm");
        assert_eq!(content_type_for("evidence_video.MP4"), "video/mp4");
        assert_eq!(content_type_for("notes"), "application/octet-stream");
    }

    #[test]
    fn error_status_mapping() {
        let bad = ApiError::from(DossierError::InvalidPathSegment {
            segment: "..".into(),
            reason: "parent directory reference",
        });
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let missing = ApiError::from(DossierError::CaseNotFound {
            case_id: "CASE_1".into(),
        });
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let io = ApiError::from(DossierError::ArtifactWriteFailed {
            path: PathBuf::from("/secret/path"),
            source: std::io::Error::other("disk full"),
        });
        assert_eq!(io.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!io.message.contains("/secret/path"));
    }
}
