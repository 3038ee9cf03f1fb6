//! The intake controller: owns the session and sequences every step.
//!
//! ```text
//! select_files ──▶ start_analysis ──▶ (review) ──▶ confirm ──▶ start_over
//!                   file 1 → file 2 → … → file n     │
//!                   strictly one call in flight       └─▶ retry (on error)
//! ```
//!
//! Every operation takes `&mut self`, so the borrow checker enforces what a
//! UI would otherwise have to guard against: nothing can select files,
//! confirm or reset while an analysis or delivery call is in flight.
//!
//! Collaborator failures are not errors of the operation. `start_analysis`
//! and `confirm` return the state they ended in; a failed call shows up as
//! [`AppState::Error`] with `error_message` set. `Err` is reserved for
//! calling an operation from a state that does not allow it.

use crate::error::{AnalysisError, IntakeError, ValidationError};
use crate::observer::{NoopObserver, SharedObserver};
use crate::pipeline::analyze::Analyzer;
use crate::pipeline::deliver::Deliverer;
use crate::pipeline::validate::validate_selection;
use crate::record::{AnalysisRecord, InputFile};
use crate::session::{transition, AppState, Event, Progress, Session};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Result of [`Controller::select_files`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// The files were accepted; the session is `FilesSelected`.
    Accepted(usize),
    /// An empty selection cleared the previous one; the session is `Idle`.
    Cleared,
    /// At least one file was not a PDF; the selection is now empty and the
    /// session is `Idle`.
    Rejected(ValidationError),
}

/// Drives one intake session from file selection to delivery.
pub struct Controller {
    session: Session,
    analyzer: Arc<dyn Analyzer>,
    deliverer: Arc<dyn Deliverer>,
    observer: SharedObserver,
}

impl Controller {
    pub fn new(analyzer: Arc<dyn Analyzer>, deliverer: Arc<dyn Deliverer>) -> Self {
        Self {
            session: Session::default(),
            analyzer,
            deliverer,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Attach an observer that is told about every session change.
    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> AppState {
        self.session.state
    }

    // ── Selection ────────────────────────────────────────────────────────

    /// Replace the current selection.
    ///
    /// Valid in `Idle` and `FilesSelected`. The selection is validated as a
    /// whole; one non-PDF clears it.
    pub fn select_files(&mut self, files: Vec<InputFile>) -> Result<Selection, IntakeError> {
        let validated = validate_selection(files);
        let event = match &validated {
            Ok(files) if !files.is_empty() => Event::SelectValidFiles,
            _ => Event::SelectInvalidOrEmpty,
        };
        self.allowed(event)?;

        let outcome = match validated {
            Ok(files) if !files.is_empty() => {
                let n = files.len();
                debug!("Selected {} file(s)", n);
                self.session.selected_files = files;
                self.session.validation_message = None;
                Selection::Accepted(n)
            }
            Ok(_) => {
                self.session.selected_files.clear();
                self.session.validation_message = None;
                Selection::Cleared
            }
            Err(e) => {
                info!("Selection rejected: {}", e);
                self.session.selected_files.clear();
                self.session.validation_message = Some(e.to_string());
                Selection::Rejected(e)
            }
        };

        self.apply(event)?;
        self.notify();
        Ok(outcome)
    }

    /// Drop one file from the selection. Returns `false` if `index` is out
    /// of range. Removing the last file returns the session to `Idle`.
    pub fn remove_file(&mut self, index: usize) -> Result<bool, IntakeError> {
        self.allowed(Event::RemoveFile)?;
        if index >= self.session.selected_files.len() {
            return Ok(false);
        }

        let removed = self.session.selected_files.remove(index);
        debug!("Removed '{}' from selection", removed.name);

        self.apply(Event::RemoveFile)?;
        if self.session.selected_files.is_empty() {
            self.apply(Event::SelectInvalidOrEmpty)?;
        }
        self.notify();
        Ok(true)
    }

    // ── Analysis ─────────────────────────────────────────────────────────

    /// Analyse every selected file, strictly in selection order.
    ///
    /// Before each file, `progress` and `current_file` are updated and the
    /// observer is notified; only then are the bytes read and the call made.
    /// The first failure abandons the remaining files and discards every
    /// record gathered so far.
    ///
    /// With an empty selection this is a no-op and returns the current state.
    pub async fn start_analysis(&mut self) -> Result<AppState, IntakeError> {
        if self.session.selected_files.is_empty() {
            debug!("start_analysis ignored: nothing selected");
            return Ok(self.session.state);
        }
        self.apply(Event::StartAnalysis)?;

        let batch_start = Instant::now();
        let files = self.session.selected_files.clone();
        let total = files.len();
        info!("Analysing {} file(s)", total);

        let mut results: Vec<AnalysisRecord> = Vec::with_capacity(total);
        for (i, file) in files.iter().enumerate() {
            let index = i + 1;
            self.session.progress = Some(Progress {
                current: index,
                total,
            });
            self.session.current_file = Some(file.name.clone());
            self.notify();
            self.observer.on_file_start(index, total, &file.name);

            let outcome = self.analyze_one(file).await;
            match outcome {
                Ok(record) => {
                    self.observer.on_file_complete(index, total, &file.name);
                    results.push(record);
                }
                Err(e) => {
                    let msg = e.to_string();
                    warn!("File {}/{} '{}' failed: {}", index, total, file.name, msg);
                    self.observer.on_file_error(index, total, &msg);
                    self.fail(Event::AnyFailed, msg)?;
                    return Ok(self.session.state);
                }
            }
        }

        self.session.analysis_results = results;
        self.session.progress = None;
        self.session.current_file = None;
        self.apply(Event::AllSucceeded)?;
        self.notify();

        info!(
            "Analysed {} file(s) in {}ms",
            total,
            batch_start.elapsed().as_millis()
        );
        Ok(self.session.state)
    }

    /// Read one file and run it through the analyzer.
    async fn analyze_one(&self, file: &InputFile) -> Result<AnalysisRecord, AnalysisError> {
        let content = file
            .read_bytes()
            .await
            .map_err(|e| AnalysisError::ReadFailed {
                file_name: file.name.clone(),
                detail: e.to_string(),
            })?;

        let descriptor = file.descriptor();
        let mut record = self.analyzer.analyze(&descriptor, content).await?;
        record.stamp_envelope(&descriptor);
        Ok(record)
    }

    // ── Delivery ─────────────────────────────────────────────────────────

    /// Send the reviewed records to the webhook.
    pub async fn confirm(&mut self) -> Result<AppState, IntakeError> {
        self.apply(Event::Confirm)?;
        self.notify();

        let outcome = self.deliverer.deliver(&self.session.analysis_results).await;
        match outcome {
            Ok(ack) => {
                info!(
                    "Delivered {} record(s){}",
                    self.session.analysis_results.len(),
                    if ack.is_some() { " with acknowledgement" } else { "" }
                );
                self.session.delivery_ack = ack;
                self.apply(Event::DeliverySucceeded)?;
                self.notify();
            }
            Err(e) => {
                warn!("Delivery failed: {}", e);
                self.fail(Event::DeliveryFailed, e.to_string())?;
            }
        }
        Ok(self.session.state)
    }

    // ── Resets ───────────────────────────────────────────────────────────

    /// Abandon the review and start again.
    pub fn cancel(&mut self) -> Result<(), IntakeError> {
        self.reset(Event::Cancel)
    }

    /// Leave the error screen.
    pub fn retry(&mut self) -> Result<(), IntakeError> {
        self.reset(Event::Retry)
    }

    /// Leave the success screen.
    pub fn start_over(&mut self) -> Result<(), IntakeError> {
        self.reset(Event::StartOver)
    }

    fn reset(&mut self, event: Event) -> Result<(), IntakeError> {
        self.allowed(event)?;
        self.session = Session::default();
        self.notify();
        Ok(())
    }

    // ── Internals ────────────────────────────────────────────────────────

    fn fail(&mut self, event: Event, message: String) -> Result<(), IntakeError> {
        self.allowed(event)?;
        self.session.analysis_results.clear();
        self.session.progress = None;
        self.session.current_file = None;
        self.session.error_message = Some(message);
        self.apply(event)?;
        self.notify();
        Ok(())
    }

    /// The state `event` leads to, or the error if it has no edge here.
    fn allowed(&self, event: Event) -> Result<AppState, IntakeError> {
        transition(self.session.state, event).ok_or(IntakeError::InvalidTransition {
            from: self.session.state,
            event,
        })
    }

    fn apply(&mut self, event: Event) -> Result<AppState, IntakeError> {
        let next = self.allowed(event)?;
        debug!("{:?} --{:?}--> {:?}", self.session.state, event, next);
        self.session.state = next;
        Ok(next)
    }

    fn notify(&self) {
        self.observer.on_state_change(&self.session);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeliveryError;
    use crate::observer::SessionObserver;
    use crate::record::fixtures::sample_record;
    use crate::record::{FileDescriptor, PDF_MEDIA_TYPE};
    use async_trait::async_trait;
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    /// Succeeds for every file except `fail_at` (0-based), logging each call.
    struct ScriptedAnalyzer {
        fail_at: Option<usize>,
        calls: Mutex<usize>,
        log: Log,
    }

    impl ScriptedAnalyzer {
        fn new(fail_at: Option<usize>, log: Log) -> Arc<Self> {
            Arc::new(Self {
                fail_at,
                calls: Mutex::new(0),
                log,
            })
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl Analyzer for ScriptedAnalyzer {
        async fn analyze(
            &self,
            file: &FileDescriptor,
            content: Vec<u8>,
        ) -> Result<AnalysisRecord, AnalysisError> {
            let call = {
                let mut c = self.calls.lock().unwrap();
                *c += 1;
                *c - 1
            };
            self.log.lock().unwrap().push(format!("call {}", file.name));
            assert!(!content.is_empty(), "bytes must be read before the call");

            if self.fail_at == Some(call) {
                return Err(AnalysisError::Rejected {
                    status: 500,
                    message: "model unavailable".into(),
                    details: None,
                });
            }
            // The model gets the envelope wrong; the controller must fix it.
            Ok(sample_record("made-up-by-model.pdf"))
        }
    }

    struct RecordingDeliverer {
        result: Result<Option<serde_json::Value>, DeliveryError>,
        received: Mutex<Vec<Vec<AnalysisRecord>>>,
    }

    impl RecordingDeliverer {
        fn new(result: Result<Option<serde_json::Value>, DeliveryError>) -> Arc<Self> {
            Arc::new(Self {
                result,
                received: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Deliverer for RecordingDeliverer {
        async fn deliver(
            &self,
            records: &[AnalysisRecord],
        ) -> Result<Option<serde_json::Value>, DeliveryError> {
            self.received.lock().unwrap().push(records.to_vec());
            self.result.clone()
        }
    }

    /// Logs the progress snapshot every time the session changes while
    /// processing.
    struct ProgressLog(Log);

    impl SessionObserver for ProgressLog {
        fn on_state_change(&self, session: &Session) {
            if let (Some(p), Some(name)) = (session.progress, &session.current_file) {
                self.0.lock().unwrap().push(format!("progress {p} {name}"));
            }
        }
    }

    fn pdf(name: &str) -> InputFile {
        InputFile::in_memory(name, PDF_MEDIA_TYPE, format!("%PDF {name}").into_bytes())
    }

    fn controller(
        fail_at: Option<usize>,
        delivery: Result<Option<serde_json::Value>, DeliveryError>,
    ) -> (Controller, Arc<ScriptedAnalyzer>, Arc<RecordingDeliverer>, Log) {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let analyzer = ScriptedAnalyzer::new(fail_at, log.clone());
        let deliverer = RecordingDeliverer::new(delivery);
        let c = Controller::new(analyzer.clone(), deliverer.clone())
            .with_observer(Arc::new(ProgressLog(log.clone())));
        (c, analyzer, deliverer, log)
    }

    #[test]
    fn valid_selection_moves_to_files_selected() {
        let (mut c, ..) = controller(None, Ok(None));
        let out = c.select_files(vec![pdf("a.pdf"), pdf("b.pdf")]).unwrap();
        assert_eq!(out, Selection::Accepted(2));
        assert_eq!(c.state(), AppState::FilesSelected);
        assert_eq!(c.session().selected_files.len(), 2);
    }

    #[test]
    fn png_selection_is_rejected_and_stays_idle() {
        let (mut c, analyzer, ..) = controller(None, Ok(None));
        let png = InputFile::in_memory("logo.png", "image/png", vec![0x89, b'P']);
        let out = c.select_files(vec![png]).unwrap();

        assert!(matches!(out, Selection::Rejected(_)));
        assert_eq!(c.state(), AppState::Idle);
        assert!(c.session().selected_files.is_empty());
        let msg = c.session().validation_message.as_deref().unwrap();
        assert!(msg.contains("Invalid file type"), "got: {msg}");
        assert_eq!(analyzer.calls(), 0);
    }

    #[test]
    fn invalid_reselection_clears_previous_selection() {
        let (mut c, ..) = controller(None, Ok(None));
        c.select_files(vec![pdf("a.pdf")]).unwrap();
        let doc = InputFile::in_memory("x.doc", "application/msword", vec![1u8]);
        c.select_files(vec![pdf("b.pdf"), doc]).unwrap();
        assert_eq!(c.state(), AppState::Idle);
        assert!(c.session().selected_files.is_empty());
    }

    #[test]
    fn reselection_replaces_rather_than_appends() {
        let (mut c, ..) = controller(None, Ok(None));
        c.select_files(vec![pdf("a.pdf"), pdf("b.pdf")]).unwrap();
        c.select_files(vec![pdf("c.pdf")]).unwrap();
        let names: Vec<_> = c.session().selected_files.iter().map(|f| f.name.clone()).collect();
        assert_eq!(names, ["c.pdf"]);
    }

    #[test]
    fn empty_selection_clears() {
        let (mut c, ..) = controller(None, Ok(None));
        c.select_files(vec![pdf("a.pdf")]).unwrap();
        assert_eq!(c.select_files(vec![]).unwrap(), Selection::Cleared);
        assert_eq!(c.state(), AppState::Idle);
    }

    #[test]
    fn remove_last_file_returns_to_idle() {
        let (mut c, ..) = controller(None, Ok(None));
        c.select_files(vec![pdf("a.pdf"), pdf("b.pdf")]).unwrap();
        assert!(!c.remove_file(5).unwrap());
        assert!(c.remove_file(0).unwrap());
        assert_eq!(c.state(), AppState::FilesSelected);
        assert_eq!(c.session().selected_files[0].name, "b.pdf");
        assert!(c.remove_file(0).unwrap());
        assert_eq!(c.state(), AppState::Idle);
    }

    #[test]
    fn remove_file_outside_selection_names_the_removal() {
        let (mut c, ..) = controller(None, Ok(None));
        let err = c.remove_file(0).unwrap_err();
        assert!(matches!(
            err,
            IntakeError::InvalidTransition {
                from: AppState::Idle,
                event: Event::RemoveFile
            }
        ));
        assert_eq!(err.to_string(), "Cannot remove a file while the session is idle");
        assert!(c.session().is_initial());
    }

    #[tokio::test]
    async fn start_with_nothing_selected_is_a_no_op() {
        let (mut c, analyzer, ..) = controller(None, Ok(None));
        assert_eq!(c.start_analysis().await.unwrap(), AppState::Idle);
        assert!(c.session().is_initial());
        assert_eq!(analyzer.calls(), 0);
    }

    #[tokio::test]
    async fn all_files_succeed_in_selection_order() {
        let (mut c, analyzer, ..) = controller(None, Ok(None));
        c.select_files(vec![pdf("first.pdf"), pdf("second.pdf"), pdf("third.pdf")])
            .unwrap();

        assert_eq!(c.start_analysis().await.unwrap(), AppState::Review);
        assert_eq!(analyzer.calls(), 3);

        let s = c.session();
        assert_eq!(s.analysis_results.len(), s.selected_files.len());
        for (rec, file) in s.analysis_results.iter().zip(&s.selected_files) {
            assert_eq!(rec.metadata.file_name, file.name);
            assert_eq!(rec.metadata.file_size, file.size);
        }
        assert!(s.progress.is_none());
        assert!(s.current_file.is_none());
    }

    #[tokio::test]
    async fn progress_is_published_before_each_call() {
        let (mut c, _, _, log) = controller(None, Ok(None));
        c.select_files(vec![pdf("a.pdf"), pdf("b.pdf")]).unwrap();
        c.start_analysis().await.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "progress 1 of 2 a.pdf",
                "call a.pdf",
                "progress 2 of 2 b.pdf",
                "call b.pdf",
            ]
        );
    }

    #[tokio::test]
    async fn failure_stops_the_batch_and_discards_results() {
        for fail_at in 0..3 {
            let (mut c, analyzer, ..) = controller(Some(fail_at), Ok(None));
            c.select_files(vec![pdf("a.pdf"), pdf("b.pdf"), pdf("c.pdf")])
                .unwrap();

            assert_eq!(c.start_analysis().await.unwrap(), AppState::Error);
            assert_eq!(analyzer.calls(), fail_at + 1, "fail_at={fail_at}");

            let s = c.session();
            assert!(s.analysis_results.is_empty());
            assert!(s.progress.is_none());
            assert_eq!(s.error_message.as_deref(), Some("model unavailable"));
        }
    }

    #[tokio::test]
    async fn unreadable_file_fails_before_any_call() {
        let (mut c, analyzer, ..) = controller(None, Ok(None));
        let missing =
            InputFile::on_disk("/definitely/not/here.pdf", "here.pdf", PDF_MEDIA_TYPE, 10);
        c.select_files(vec![missing]).unwrap();

        assert_eq!(c.start_analysis().await.unwrap(), AppState::Error);
        assert_eq!(analyzer.calls(), 0);
        assert!(c
            .session()
            .error_message
            .as_deref()
            .unwrap()
            .contains("here.pdf"));
    }

    #[tokio::test]
    async fn confirm_delivers_exactly_the_reviewed_records() {
        let ack = serde_json::json!({ "status": "queued" });
        let (mut c, _, deliverer, _) = controller(None, Ok(Some(ack.clone())));
        c.select_files(vec![pdf("a.pdf"), pdf("b.pdf")]).unwrap();
        c.start_analysis().await.unwrap();
        let reviewed = c.session().analysis_results.clone();

        assert_eq!(c.confirm().await.unwrap(), AppState::Success);
        assert_eq!(*deliverer.received.lock().unwrap(), vec![reviewed]);
        assert_eq!(c.session().delivery_ack, Some(ack));
    }

    #[tokio::test]
    async fn delivery_without_ack_still_succeeds() {
        let (mut c, ..) = controller(None, Ok(None));
        c.select_files(vec![pdf("a.pdf")]).unwrap();
        c.start_analysis().await.unwrap();
        assert_eq!(c.confirm().await.unwrap(), AppState::Success);
        assert!(c.session().delivery_ack.is_none());
    }

    #[tokio::test]
    async fn delivery_failure_goes_to_error() {
        let (mut c, ..) = controller(
            None,
            Err(DeliveryError::Rejected {
                status: 502,
                body: "upstream down".into(),
            }),
        );
        c.select_files(vec![pdf("a.pdf")]).unwrap();
        c.start_analysis().await.unwrap();

        assert_eq!(c.confirm().await.unwrap(), AppState::Error);
        assert_eq!(
            c.session().error_message.as_deref(),
            Some("Webhook responded with status 502: upstream down")
        );
        assert!(c.session().analysis_results.is_empty());
    }

    #[tokio::test]
    async fn resets_from_terminal_states_restore_initial_session() {
        // Success → start over
        let (mut c, ..) = controller(None, Ok(Some(serde_json::json!(1))));
        c.select_files(vec![pdf("a.pdf")]).unwrap();
        c.start_analysis().await.unwrap();
        c.confirm().await.unwrap();
        c.start_over().unwrap();
        assert!(c.session().is_initial());

        // Error → retry
        let (mut c, ..) = controller(Some(0), Ok(None));
        c.select_files(vec![pdf("a.pdf")]).unwrap();
        c.start_analysis().await.unwrap();
        c.retry().unwrap();
        assert!(c.session().is_initial());
        // Reset again from the same (now initial) shape is refused, not silently accepted.
        assert!(c.retry().is_err());
    }

    #[tokio::test]
    async fn cancel_from_review_resets() {
        let (mut c, ..) = controller(None, Ok(None));
        c.select_files(vec![pdf("a.pdf")]).unwrap();
        c.start_analysis().await.unwrap();
        c.cancel().unwrap();
        assert!(c.session().is_initial());
    }

    #[test]
    fn illegal_events_leave_session_untouched() {
        let (mut c, ..) = controller(None, Ok(None));
        c.select_files(vec![pdf("a.pdf")]).unwrap();
        let before = c.session().clone();

        assert!(matches!(
            c.cancel(),
            Err(IntakeError::InvalidTransition {
                from: AppState::FilesSelected,
                event: Event::Cancel
            })
        ));
        assert!(c.start_over().is_err());
        assert_eq!(*c.session(), before);
    }

    #[tokio::test]
    async fn confirm_outside_review_is_refused() {
        let (mut c, _, deliverer, _) = controller(None, Ok(None));
        assert!(c.confirm().await.is_err());
        assert!(deliverer.received.lock().unwrap().is_empty());
    }
}
