//! # pdf-intake
//!
//! Turn a batch of PDF documents into structured analysis records, let a
//! person review them, and forward the approved set to a webhook.
//!
//! ## Why this crate?
//!
//! Intake desks receive briefs, RFPs and economic proposals as PDFs and need
//! the same handful of facts out of each one: who sent it, what they want,
//! what is in and out of scope, and what it costs. This crate sends each
//! document to an analysis service that returns those facts as JSON, holds
//! the results for review, and only delivers them once someone confirms.
//!
//! ## Flow Overview
//!
//! ```text
//! PDFs
//!  │
//!  ├─ 1. Select    resolve paths, reject anything that is not application/pdf
//!  ├─ 2. Analyse   one POST per file, strictly in order, one in flight
//!  ├─ 3. Review    every record held in memory, nothing sent yet
//!  ├─ 4. Deliver   one POST of the whole array to the webhook
//!  └─ 5. Finish    success or error, then back to a fresh session
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_intake::{resolve_inputs, Controller, HttpAnalyzer, IntakeConfig, WebhookDeliverer};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = IntakeConfig::builder()
//!         .analysis_endpoint("http://127.0.0.1:8787/api/analyze")
//!         .build()?;
//!     let mut controller = Controller::new(
//!         Arc::new(HttpAnalyzer::from_config(&config)?),
//!         Arc::new(WebhookDeliverer::from_config(&config)?),
//!     );
//!
//!     controller.select_files(resolve_inputs(&["brief.pdf"]).await?)?;
//!     controller.start_analysis().await?;
//!     println!("{}", controller.session().results_json_pretty()?);
//!     controller.confirm().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `pdf-intake` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `server` | on      | Enables [`server`], the `POST /api/analyze` service (axum) |
//!
//! Disable both when using only the client library:
//! ```toml
//! pdf-intake = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod controller;
pub mod error;
pub mod observer;
pub mod pipeline;
pub mod present;
pub mod prompts;
pub mod record;
#[cfg(feature = "server")]
pub mod server;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{resolve_delivery_endpoint, IntakeConfig, IntakeConfigBuilder, ServerConfig};
pub use controller::{Controller, Selection};
pub use error::{AnalysisError, DeliveryError, IntakeError, ValidationError};
pub use observer::{NoopObserver, SessionObserver, SharedObserver};
pub use pipeline::analyze::{Analyzer, HttpAnalyzer};
pub use pipeline::deliver::{Deliverer, WebhookDeliverer};
pub use pipeline::input::resolve_inputs;
pub use record::{
    AnalysisRecord, EconomicProposal, FileDescriptor, InputFile, RecordMetadata, Scope,
    ADVISORY_MAX_FILE_BYTES, PDF_MEDIA_TYPE,
};
pub use session::{transition, AppState, Event, Progress, Session};
