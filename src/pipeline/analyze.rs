//! Analysis client: one request per file to the analysis service.
//!
//! The [`Analyzer`] trait is the seam the controller sequences over. The
//! production implementation, [`HttpAnalyzer`], POSTs the base64 content and
//! the file's envelope to the configured endpoint and parses the structured
//! record out of the response.
//!
//! There is no retry. The analysis endpoint is priced per call and a failed
//! file aborts the whole batch anyway, so a second attempt would only add
//! cost to a session that is already going to the error screen.

use crate::config::IntakeConfig;
use crate::error::{AnalysisError, IntakeError, UNKNOWN_ANALYSIS_ERROR};
use crate::pipeline::encode::encode_bytes_async;
use crate::record::{AnalysisRecord, FileDescriptor};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

/// Produces one analysis record per file.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Analyse one file whose bytes have already been read.
    ///
    /// Implementations must return a record whose `metadata.file_name`,
    /// `file_type` and `file_size` equal `file`'s.
    async fn analyze(
        &self,
        file: &FileDescriptor,
        content: Vec<u8>,
    ) -> Result<AnalysisRecord, AnalysisError>;
}

/// Request body of `POST /api/analyze`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest<'a> {
    pub base64_content: String,
    pub file: &'a FileDescriptor,
}

/// Error body returned by the analysis service with a non-2xx status.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnalysisErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// [`Analyzer`] that calls the analysis service over HTTP.
#[derive(Debug, Clone)]
pub struct HttpAnalyzer {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpAnalyzer {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// Build from config, with a fresh client.
    pub fn from_config(config: &IntakeConfig) -> Result<Self, IntakeError> {
        Ok(Self::new(config.http_client()?, config.analysis_endpoint.clone()))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Analyzer for HttpAnalyzer {
    async fn analyze(
        &self,
        file: &FileDescriptor,
        content: Vec<u8>,
    ) -> Result<AnalysisRecord, AnalysisError> {
        let start = Instant::now();

        let base64_content = encode_bytes_async(content)
            .await
            .map_err(|e| AnalysisError::ReadFailed {
                file_name: file.name.clone(),
                detail: format!("encoding task failed: {e}"),
            })?;

        let body = AnalyzeRequest {
            base64_content,
            file,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| AnalysisError::Transport {
                detail: e.to_string(),
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| AnalysisError::Transport {
            detail: e.to_string(),
        })?;

        if !status.is_success() {
            let err = rejection(status.as_u16(), &text);
            if let AnalysisError::Rejected {
                details: Some(ref d),
                ..
            } = err
            {
                warn!("Analysis of '{}' rejected ({}): {}", file.name, status, d);
            }
            return Err(err);
        }

        let mut record: AnalysisRecord =
            serde_json::from_str(&text).map_err(|e| AnalysisError::MalformedResponse {
                detail: e.to_string(),
            })?;
        record.stamp_envelope(file);

        debug!(
            "Analysed '{}' ({} bytes) in {:?}",
            file.name,
            file.size,
            start.elapsed()
        );
        Ok(record)
    }
}

/// Map a non-2xx analysis response to an error.
///
/// The server's `error` field is the message when present; a JSON body
/// without it falls back to the status line; a body that is not JSON at all
/// gets the generic message.
pub fn rejection(status: u16, body: &str) -> AnalysisError {
    match serde_json::from_str::<AnalysisErrorBody>(body) {
        Ok(parsed) => AnalysisError::Rejected {
            status,
            message: parsed
                .error
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| format!("Server responded with status {status}")),
            details: parsed.details,
        },
        Err(_) => AnalysisError::Rejected {
            status,
            message: UNKNOWN_ANALYSIS_ERROR.to_string(),
            details: None,
        },
    }
}
