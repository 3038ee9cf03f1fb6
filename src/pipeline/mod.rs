//! Pipeline stages between a user's file selection and the webhook.
//!
//! Each submodule implements exactly one step. Keeping the steps apart lets
//! the controller be tested with fake collaborators while the HTTP clients
//! are tested against real sockets.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ validate ──▶ encode ──▶ analyze ──▶ (review) ──▶ deliver
//! (paths)   (PDF only)   (base64)   (1 call/file)            (1 call)
//! ```
//!
//! 1. [`input`]    — turn user-supplied paths into [`crate::InputFile`]s with
//!    a declared name, media type and size
//! 2. [`validate`] — accept the selection only if every file is a PDF
//! 3. [`encode`]   — base64-encode file bytes off the async executor
//! 4. [`analyze`]  — one request per file to the analysis service
//! 5. [`deliver`]  — one request carrying every record to the webhook

pub mod analyze;
pub mod deliver;
pub mod encode;
pub mod input;
pub mod validate;
