//! Error types for the pdf-intake library.
//!
//! Three collaborators can fail, and each has its own error type so callers
//! can tell them apart without string matching:
//!
//! * [`ValidationError`] — the user picked something that is not a PDF.
//!   Recovered locally: the session stays in (or returns to) `Idle` and no
//!   network call is made.
//!
//! * [`AnalysisError`] — one per-file analysis call failed. The controller
//!   abandons the rest of the batch and surfaces the message verbatim.
//!
//! * [`DeliveryError`] — the webhook call failed.
//!
//! [`IntakeError`] wraps all three plus the controller's own misuse errors and
//! is what the public `Controller` operations return.

use crate::session::{AppState, Event};
use std::path::PathBuf;
use thiserror::Error;

/// Message used when an analysis error body cannot be read as JSON.
pub const UNKNOWN_ANALYSIS_ERROR: &str = "An unknown error occurred during analysis.";

/// All errors returned by the pdf-intake library.
#[derive(Debug, Error)]
pub enum IntakeError {
    // ── Collaborator errors ───────────────────────────────────────────────
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    // ── Controller errors ─────────────────────────────────────────────────
    /// The event has no edge out of the current state. The session is left
    /// untouched.
    #[error("Cannot {event} while the session is {from}")]
    InvalidTransition { from: AppState, event: Event },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The analysis server has no model credential.
    #[error("Server configuration error: {0}")]
    ServerConfiguration(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A candidate selection was rejected before upload.
///
/// This check runs on the client only. It is not a security boundary: the
/// analysis server still has to cope with whatever bytes it is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid file type detected. Please upload PDF files only. ('{file_name}' is {declared_type})")]
pub struct ValidationError {
    pub file_name: String,
    pub declared_type: String,
}

/// A single per-file analysis call failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// The file's bytes could not be read before the call was issued.
    #[error("Failed to read '{file_name}': {detail}")]
    ReadFailed { file_name: String, detail: String },

    /// The request never produced an HTTP response.
    #[error("Failed to reach the analysis service: {detail}")]
    Transport { detail: String },

    /// The service answered with a non-success status.
    ///
    /// `message` is the server's `error` field when present; `details` is
    /// kept for logs but not shown.
    #[error("{message}")]
    Rejected {
        status: u16,
        message: String,
        details: Option<String>,
    },

    /// A 2xx response whose body is not a complete analysis record.
    #[error("Analysis response was malformed: {detail}")]
    MalformedResponse { detail: String },
}

/// The webhook delivery call failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The request never produced an HTTP response.
    #[error("Failed to reach the webhook: {detail}")]
    Transport { detail: String },

    /// The webhook answered with a non-success status. `body` is verbatim.
    #[error("Webhook responded with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The webhook declared JSON but sent something else.
    #[error("Webhook acknowledgement is not valid JSON: {detail}")]
    MalformedAck { detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_analysis_displays_server_message_only() {
        let e = AnalysisError::Rejected {
            status: 500,
            message: "model unavailable".into(),
            details: Some("upstream 503".into()),
        };
        assert_eq!(e.to_string(), "model unavailable");
    }

    #[test]
    fn rejected_delivery_includes_status_and_body() {
        let e = DeliveryError::Rejected {
            status: 404,
            body: "no such hook".into(),
        };
        assert_eq!(
            e.to_string(),
            "Webhook responded with status 404: no such hook"
        );
    }

    #[test]
    fn validation_error_mentions_pdf_only() {
        let e = ValidationError {
            file_name: "logo.png".into(),
            declared_type: "image/png".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("PDF files only"), "got: {msg}");
        assert!(msg.contains("image/png"), "got: {msg}");
    }

    #[test]
    fn intake_error_is_transparent_over_analysis() {
        let e: IntakeError = AnalysisError::Transport {
            detail: "connection refused".into(),
        }
        .into();
        assert!(e.to_string().contains("connection refused"));
    }

    #[test]
    fn invalid_transition_display() {
        let e = IntakeError::InvalidTransition {
            from: AppState::Idle,
            event: Event::Confirm,
        };
        assert_eq!(e.to_string(), "Cannot confirm while the session is idle");
    }
}
