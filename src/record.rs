//! Data types: the analysis record produced for each document, and the input
//! files the user selects.
//!
//! The record mirrors the structured-output schema the analysis service asks
//! the model for (see [`crate::prompts::analysis_schema`]). Field names are
//! camelCase on the wire. Every field is required; a response that omits one
//! is rejected at the client boundary rather than patched up at render time.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The media type accepted by the file validator.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Upload size shown to the user as guidance. Never enforced.
pub const ADVISORY_MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// Structured extraction result for one input document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub metadata: RecordMetadata,
    pub executive_summary: String,
    /// Full extracted text. May be empty, never absent.
    pub full_text: String,
    pub brief_objectives: Vec<String>,
    pub requirements: Vec<String>,
    pub scope: Scope,
    pub economic_proposal: EconomicProposal,
}

impl AnalysisRecord {
    /// Replace the envelope metadata with the values of the originating file.
    ///
    /// The model only sees content and routinely mis-reports name, type and
    /// size, so these three fields are never taken from its output.
    pub fn stamp_envelope(&mut self, file: &FileDescriptor) {
        self.metadata.file_name = file.name.clone();
        self.metadata.file_type = file.file_type.clone();
        self.metadata.file_size = file.size;
    }
}

/// Document metadata. `company`, `contact_person` and `document_date` are
/// inferred by the model and may be empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetadata {
    #[serde(default, deserialize_with = "lenient_string")]
    pub file_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub file_type: String,
    #[serde(default, deserialize_with = "lenient_size")]
    pub file_size: u64,
    pub company: String,
    pub contact_person: String,
    pub document_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    pub in_scope: Vec<String>,
    pub out_of_scope: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EconomicProposal {
    pub costs: Vec<String>,
    pub timelines: Vec<String>,
    pub resources: Vec<String>,
}

// ── Envelope fields ─────────────────────────────────────────────────────────
//
// `file_name`, `file_type` and `file_size` are overwritten by
// `stamp_envelope` after every analysis, so whatever the model wrote there is
// accepted and a missing or mistyped value never fails the document.

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        _ => String::new(),
    })
}

fn lenient_size<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let serde_json::Value::Number(n) = serde_json::Value::deserialize(deserializer)? else {
        return Ok(0);
    };
    Ok(match (n.as_u64(), n.as_f64()) {
        (Some(u), _) => u,
        (None, Some(f)) if f.is_finite() && f >= 0.0 => f.round() as u64,
        _ => 0,
    })
}

/// Name, declared type and size of a file as sent alongside its content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: String,
    pub size: u64,
}

/// A file the user selected for analysis.
///
/// Holds the declared envelope (name, type, size) eagerly and the bytes
/// lazily: reading the content is an async step the controller performs
/// right before that file's analysis call.
#[derive(Debug, Clone, PartialEq)]
pub struct InputFile {
    pub name: String,
    /// Declared media type, e.g. `application/pdf`.
    pub content_type: String,
    /// Size in bytes.
    pub size: u64,
    source: FileSource,
}

#[derive(Debug, Clone, PartialEq)]
enum FileSource {
    Disk(PathBuf),
    Memory(Arc<[u8]>),
}

impl InputFile {
    /// A file on disk whose envelope has already been resolved.
    pub fn on_disk(
        path: impl Into<PathBuf>,
        name: impl Into<String>,
        content_type: impl Into<String>,
        size: u64,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            size,
            source: FileSource::Disk(path.into()),
        }
    }

    /// A file whose bytes are already in memory. The size is the byte length.
    pub fn in_memory(
        name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        let bytes: Vec<u8> = bytes.into();
        Self {
            name: name.into(),
            content_type: content_type.into(),
            size: bytes.len() as u64,
            source: FileSource::Memory(Arc::from(bytes)),
        }
    }

    /// Path on disk, if the file is backed by one.
    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            FileSource::Disk(p) => Some(p),
            FileSource::Memory(_) => None,
        }
    }

    /// Read the file's content.
    pub async fn read_bytes(&self) -> std::io::Result<Vec<u8>> {
        match &self.source {
            FileSource::Disk(p) => tokio::fs::read(p).await,
            FileSource::Memory(b) => Ok(b.to_vec()),
        }
    }

    pub fn descriptor(&self) -> FileDescriptor {
        FileDescriptor {
            name: self.name.clone(),
            file_type: self.content_type.clone(),
            size: self.size,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A complete record as a model might return it, with envelope fields
    /// that disagree with the real file.
    pub fn sample_record(name: &str) -> AnalysisRecord {
        AnalysisRecord {
            metadata: RecordMetadata {
                file_name: name.to_string(),
                file_type: PDF_MEDIA_TYPE.to_string(),
                file_size: 1024,
                company: "Acme Corp".into(),
                contact_person: "Jordan Lee".into(),
                document_date: "2024-03-01".into(),
            },
            executive_summary: "Proposal to migrate the billing platform.".into(),
            full_text: "Billing migration proposal...".into(),
            brief_objectives: vec!["Reduce invoice latency".into()],
            requirements: vec!["SOC 2 compliance".into()],
            scope: Scope {
                in_scope: vec!["Data migration".into()],
                out_of_scope: vec!["Mobile app".into()],
            },
            economic_proposal: EconomicProposal {
                costs: vec!["$120,000".into()],
                timelines: vec!["Q3 2024".into()],
                resources: vec!["2 engineers".into()],
            },
        }
    }
}
