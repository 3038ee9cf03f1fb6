//! Analysis server: the HTTP service the analysis client talks to.
//!
//! Exposes a single route, `POST /api/analyze`, which takes one base64
//! document plus its envelope, asks the configured [`DocumentModel`] for a
//! structured record, and answers with that record. Failures are JSON bodies
//! of the shape the client's [`rejection`](crate::pipeline::analyze::rejection)
//! mapping expects.

mod extract;
mod model;

pub use extract::{clean_json, parse_record};
pub use model::{build_messages, DocumentModel, DocumentRequest, LlmDocumentModel, ModelError};

use crate::config::ServerConfig;
use crate::error::IntakeError;
use crate::pipeline::analyze::AnalysisErrorBody;
use crate::record::FileDescriptor;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Largest request body accepted. A 10 MiB PDF is about 14 MiB once base64
/// encoded; axum's own default of 2 MiB would reject most documents.
pub const MAX_REQUEST_BYTES: usize = 64 * 1024 * 1024;

pub const MISSING_FIELDS_MESSAGE: &str =
    "Missing required fields: base64Content or file details.";
pub const ANALYSIS_FAILED_MESSAGE: &str = "Failed to analyze the document via the AI model.";

/// Shared state for the analysis server.
#[derive(Clone, Default)]
pub struct ServerState {
    /// `None` when the server started without a usable model; every request
    /// then fails with a configuration error.
    pub model: Option<Arc<dyn DocumentModel>>,
}

impl ServerState {
    pub fn new(model: Arc<dyn DocumentModel>) -> Self {
        Self { model: Some(model) }
    }

    /// State for `config`. A missing credential or provider is logged and
    /// leaves the server running without a model.
    pub fn from_config(config: &ServerConfig) -> Self {
        match LlmDocumentModel::from_config(config) {
            Ok(model) => Self::new(Arc::new(model)),
            Err(e) => {
                error!("{e}");
                Self::default()
            }
        }
    }
}

/// Build the router.
pub fn create_router(state: ServerState) -> Router {
    Router::new()
        .route("/api/analyze", post(analyze))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BYTES))
        .with_state(state)
}

/// Start the analysis server and run until the process is stopped.
pub async fn serve(config: &ServerConfig) -> Result<(), IntakeError> {
    let app = create_router(ServerState::from_config(config));
    let addr = config.bind_addr();

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| IntakeError::Internal(format!("cannot bind {addr}: {e}")))?;
    info!("Analysis server listening on http://{addr}/api/analyze");

    axum::serve(listener, app)
        .await
        .map_err(|e| IntakeError::Internal(format!("server error: {e}")))
}

// ── Handler ─────────────────────────────────────────────────────────────────

/// Request body with every field optional, so a missing field is a 400 with
/// our message rather than an extractor rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IncomingRequest {
    base64_content: Option<String>,
    file: Option<IncomingFile>,
}

#[derive(Debug, Default, Deserialize)]
struct IncomingFile {
    name: Option<String>,
    #[serde(rename = "type")]
    file_type: Option<String>,
    size: Option<f64>,
}

impl IncomingRequest {
    /// The content and envelope, if all required fields are present.
    fn into_parts(self) -> Option<(String, FileDescriptor)> {
        let content = self.base64_content.filter(|c| !c.is_empty())?;
        let file = self.file?;
        let name = file.name.filter(|n| !n.is_empty())?;
        let file_type = file.file_type.filter(|t| !t.is_empty())?;
        let size = file.size.filter(|s| s.is_finite() && *s > 0.0)?;
        Some((
            content,
            FileDescriptor {
                name,
                file_type,
                size: size.round() as u64,
            },
        ))
    }
}

async fn analyze(State(state): State<ServerState>, body: Bytes) -> Response {
    let Some(model) = state.model.clone() else {
        error!("Analysis request refused: no model configured");
        let message = IntakeError::ServerConfiguration("Missing API key.".into()).to_string();
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, message, None);
    };

    let parts = serde_json::from_slice::<IncomingRequest>(&body)
        .ok()
        .and_then(IncomingRequest::into_parts);
    let Some((base64_content, file)) = parts else {
        return error_response(StatusCode::BAD_REQUEST, MISSING_FIELDS_MESSAGE.into(), None);
    };

    info!("Analysing '{}' ({} bytes)", file.name, file.size);

    let request = DocumentRequest {
        base64_content,
        mime_type: file.file_type.clone(),
        file_name: file.name.clone(),
        file_size: file.size,
    };

    let raw = match model.generate(&request).await {
        Ok(raw) => raw,
        Err(e) => return analysis_failed(&file, e.to_string()),
    };

    match parse_record(&raw) {
        Ok(mut record) => {
            record.stamp_envelope(&file);
            Json(record).into_response()
        }
        Err(e) => analysis_failed(&file, format!("model output is not a valid record: {e}")),
    }
}

fn analysis_failed(file: &FileDescriptor, details: String) -> Response {
    warn!("Analysis of '{}' failed: {}", file.name, details);
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        ANALYSIS_FAILED_MESSAGE.into(),
        Some(details),
    )
}

fn error_response(status: StatusCode, message: String, details: Option<String>) -> Response {
    let body = AnalysisErrorBody {
        error: Some(message),
        details,
    };
    (status, Json(body)).into_response()
}
