//! Observer trait for session events.
//!
//! Inject an [`Arc<dyn SessionObserver>`] into the
//! [`crate::controller::Controller`] to be told about every session change as
//! it happens. The controller notifies synchronously after each mutation and
//! before its next suspension point, so a front end sees "analysing file k"
//! while call k is in flight, not after it returns.
//!
//! # Example
//!
//! ```rust
//! use pdf_intake::{Session, SessionObserver};
//!
//! struct Printer;
//!
//! impl SessionObserver for Printer {
//!     fn on_file_start(&self, index: usize, total: usize, file_name: &str) {
//!         eprintln!("analysing {file_name} ({index} of {total})");
//!     }
//! }
//! ```

use crate::session::Session;
use std::sync::Arc;

/// Receives session events from the controller.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait SessionObserver: Send + Sync {
    /// Called after every mutation of the session, with the new snapshot.
    fn on_state_change(&self, session: &Session) {
        let _ = session;
    }

    /// Called just before a file's bytes are read and its analysis request
    /// is sent. `progress` on the session already points at this file.
    ///
    /// # Arguments
    /// * `index`     — 1-based position of the file in the selection
    /// * `total`     — number of selected files
    /// * `file_name` — the file's declared name
    fn on_file_start(&self, index: usize, total: usize, file_name: &str) {
        let _ = (index, total, file_name);
    }

    /// Called when a file's analysis record has been received.
    fn on_file_complete(&self, index: usize, total: usize, file_name: &str) {
        let _ = (index, total, file_name);
    }

    /// Called when a file's analysis failed. No further files are attempted.
    fn on_file_error(&self, index: usize, total: usize, error: &str) {
        let _ = (index, total, error);
    }
}

/// A no-op observer. This is the default when none is configured.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}

/// Convenience alias for the type held by the controller.
pub type SharedObserver = Arc<dyn SessionObserver>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::AppState;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        states: Mutex<Vec<AppState>>,
        starts: Mutex<Vec<(usize, usize, String)>>,
    }

    impl SessionObserver for Recorder {
        fn on_state_change(&self, session: &Session) {
            self.states.lock().unwrap().push(session.state);
        }

        fn on_file_start(&self, index: usize, total: usize, file_name: &str) {
            self.starts
                .lock()
                .unwrap()
                .push((index, total, file_name.to_string()));
        }
    }

    #[test]
    fn noop_observer_does_not_panic() {
        let obs = NoopObserver;
        obs.on_state_change(&Session::default());
        obs.on_file_start(1, 2, "a.pdf");
        obs.on_file_complete(1, 2, "a.pdf");
        obs.on_file_error(2, 2, "boom");
    }

    #[test]
    fn overridden_methods_receive_events() {
        let rec = Recorder::default();
        rec.on_state_change(&Session::default());
        rec.on_file_start(1, 3, "brief.pdf");
        rec.on_file_complete(1, 3, "brief.pdf");

        assert_eq!(*rec.states.lock().unwrap(), vec![AppState::Idle]);
        assert_eq!(
            *rec.starts.lock().unwrap(),
            vec![(1, 3, "brief.pdf".to_string())]
        );
    }

    #[test]
    fn arc_dyn_observer_works() {
        let obs: SharedObserver = Arc::new(NoopObserver);
        obs.on_file_start(1, 1, "x.pdf");
    }
}
