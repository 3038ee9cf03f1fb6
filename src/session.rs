//! Session state and the transition table that governs it.
//!
//! ```text
//!            select(valid)            start             all ok
//!   Idle ───────────────▶ FilesSelected ─────▶ Processing ──────▶ Review
//!    ▲  ◀─────────────────     │  ▲                 │               │  │
//!    │   select(invalid/empty) └──┘ select(valid)   │ any failed    │  │ confirm
//!    │                                              ▼               │  ▼
//!    ├──────────────── retry ─────────────────── Error ◀──────── Sending
//!    ├──────────────── cancel ──────────────────────────────────┘    │ ok
//!    └──────────────── start over ─────────────── Success ◀──────────┘
//! ```
//!
//! [`transition`] is the only place these edges are written down. The
//! controller asks it before every mutation, so an event that has no edge
//! from the current state can never leave the session half-updated.

use crate::record::{AnalysisRecord, InputFile};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The state of one intake session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppState {
    #[default]
    Idle,
    FilesSelected,
    Processing,
    Review,
    Sending,
    Success,
    Error,
}

impl AppState {
    /// `Success` and `Error` are only left through a full reset.
    pub fn is_terminal(self) -> bool {
        matches!(self, AppState::Success | AppState::Error)
    }

    /// A remote call is in flight; no user event is accepted.
    pub fn is_busy(self) -> bool {
        matches!(self, AppState::Processing | AppState::Sending)
    }
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AppState::Idle => "idle",
            AppState::FilesSelected => "files selected",
            AppState::Processing => "processing",
            AppState::Review => "in review",
            AppState::Sending => "sending",
            AppState::Success => "finished",
            AppState::Error => "failed",
        })
    }
}

/// Everything that can move the session from one state to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Event {
    SelectValidFiles,
    SelectInvalidOrEmpty,
    RemoveFile,
    StartAnalysis,
    AllSucceeded,
    AnyFailed,
    Confirm,
    DeliverySucceeded,
    DeliveryFailed,
    Cancel,
    Retry,
    StartOver,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Event::SelectValidFiles | Event::SelectInvalidOrEmpty => "select files",
            Event::RemoveFile => "remove a file",
            Event::StartAnalysis => "start analysis",
            Event::AllSucceeded => "finish analysis",
            Event::AnyFailed => "fail analysis",
            Event::Confirm => "confirm",
            Event::DeliverySucceeded => "finish delivery",
            Event::DeliveryFailed => "fail delivery",
            Event::Cancel => "cancel",
            Event::Retry => "retry",
            Event::StartOver => "start over",
        })
    }
}

/// The state reached by applying `event` in `state`, or `None` if the
/// event is not allowed there.
pub fn transition(state: AppState, event: Event) -> Option<AppState> {
    use AppState::*;
    use Event::*;

    match (state, event) {
        (Idle | FilesSelected, SelectValidFiles) => Some(FilesSelected),
        (Idle | FilesSelected, SelectInvalidOrEmpty) => Some(Idle),
        (FilesSelected, RemoveFile) => Some(FilesSelected),
        (FilesSelected, StartAnalysis) => Some(Processing),
        (Processing, AllSucceeded) => Some(Review),
        (Processing, AnyFailed) => Some(Error),
        (Review, Confirm) => Some(Sending),
        (Review, Cancel) => Some(Idle),
        (Sending, DeliverySucceeded) => Some(Success),
        (Sending, DeliveryFailed) => Some(Error),
        (Error | Success, Retry | StartOver) => Some(Idle),
        _ => None,
    }
}

/// Position of the file currently being analysed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// 1-based index of the file in flight.
    pub current: usize,
    pub total: usize,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {}", self.current, self.total)
    }
}

/// The controller's full in-memory state for one user visit.
///
/// `Session::default()` is the initial shape every reset returns to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub state: AppState,
    /// Current selection, in the order the user picked the files.
    pub selected_files: Vec<InputFile>,
    /// One record per selected file, same order. Only set on `Review` and
    /// kept unchanged through `Sending`.
    pub analysis_results: Vec<AnalysisRecord>,
    /// Present only while `Processing`.
    pub progress: Option<Progress>,
    /// Name of the file being analysed, only while `Processing`.
    pub current_file: Option<String>,
    /// Why the last selection was rejected.
    pub validation_message: Option<String>,
    /// Present only in `Error`.
    pub error_message: Option<String>,
    /// Webhook acknowledgement, only in `Success` and only when the webhook
    /// answered with a JSON body.
    pub delivery_ack: Option<serde_json::Value>,
}

impl Session {
    /// True when the session has exactly the shape of a fresh visit.
    pub fn is_initial(&self) -> bool {
        *self == Session::default()
    }

    /// All analysis results as pretty-printed JSON, in selection order.
    pub fn results_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.analysis_results)
    }
}
