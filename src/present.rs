//! Terminal renderers, one per session state.
//!
//! Every function here is a pure `&Session → String`: no I/O and no state
//! of its own. The binary decides where the text goes.

use crate::record::{AnalysisRecord, ADVISORY_MAX_FILE_BYTES};
use crate::session::{AppState, Session};

/// Stage messages cycled by the processing spinner.
pub const PROCESSING_STEPS: [&str; 6] = [
    "Initializing analysis engine...",
    "Extracting text content...",
    "Identifying document structure...",
    "Applying semantic analysis...",
    "Generating executive summary...",
    "Finalizing JSON output...",
];

/// Characters of full text shown in review unless the caller asks for all.
pub const FULL_TEXT_PREVIEW_CHARS: usize = 600;

const NONE_SPECIFIED: &str = "None specified.";
const NO_TEXT: &str = "No text could be extracted from the document.";

// ── ANSI styling ────────────────────────────────────────────────────────────

/// Whether renderers emit ANSI colour codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Style {
    pub ansi: bool,
}

impl Style {
    pub const PLAIN: Style = Style { ansi: false };
    pub const ANSI: Style = Style { ansi: true };

    fn paint(self, code: &str, s: &str) -> String {
        if self.ansi {
            format!("\x1b[{code}m{s}\x1b[0m")
        } else {
            s.to_string()
        }
    }

    pub fn green(self, s: &str) -> String {
        self.paint("32", s)
    }
    pub fn red(self, s: &str) -> String {
        self.paint("31", s)
    }
    pub fn dim(self, s: &str) -> String {
        self.paint("2", s)
    }
    pub fn bold(self, s: &str) -> String {
        self.paint("1", s)
    }
    pub fn cyan(self, s: &str) -> String {
        self.paint("36", s)
    }
}

/// Options for the review screen.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReviewOptions {
    /// Print each document's full text instead of a preview.
    pub full_text: bool,
}

// ── Small formatters ────────────────────────────────────────────────────────

/// Bytes as megabytes with two decimals, e.g. `"1.50 MB"`.
pub fn format_mb(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
}

/// Label of the confirm action for `n` documents.
pub fn confirm_label(n: usize) -> String {
    let noun = if n == 1 { "Summary" } else { "Summaries" };
    format!("Confirm & Send {n} {noun}")
}

/// Processing stage message for spinner tick `tick`.
pub fn processing_step(tick: usize) -> &'static str {
    PROCESSING_STEPS[tick % PROCESSING_STEPS.len()]
}

/// "Analyzing document (k of n): name", when a file is in flight.
pub fn processing_message(session: &Session) -> Option<String> {
    let progress = session.progress?;
    let name = session.current_file.as_deref().unwrap_or_default();
    Some(format!("Analyzing document ({progress}): {name}"))
}

// ── Screens ─────────────────────────────────────────────────────────────────

/// Render whatever screen belongs to the session's current state.
pub fn render(session: &Session, style: Style, options: ReviewOptions) -> String {
    match session.state {
        AppState::Idle | AppState::FilesSelected => render_upload(session, style),
        AppState::Processing => render_processing(session, style),
        AppState::Review => render_review(session, style, options),
        AppState::Sending => format!(
            "{} Sending {} summaries...",
            style.cyan("◆"),
            session.analysis_results.len()
        ),
        AppState::Success => render_success(session, style, None),
        AppState::Error => render_error(session, style),
    }
}

/// Upload surface: guidance, selected files, and any validation message.
pub fn render_upload(session: &Session, style: Style) -> String {
    let mut out = Vec::new();
    out.push(style.bold("Upload documents"));
    out.push(style.dim(&format!(
        "(only PDF, up to {})",
        format_mb_short(ADVISORY_MAX_FILE_BYTES)
    )));

    if let Some(message) = &session.validation_message {
        out.push(format!("{} {}", style.red("✗"), style.red(message)));
    }

    if !session.selected_files.is_empty() {
        out.push(String::new());
        out.push(format!("Selected files ({}):", session.selected_files.len()));
        for file in &session.selected_files {
            let mut line = format!(
                "  {} {}  {}",
                style.green("•"),
                file.name,
                style.dim(&format_mb(file.size))
            );
            if file.size > ADVISORY_MAX_FILE_BYTES {
                line.push_str(&format!("  {}", style.cyan("⚠ larger than recommended")));
            }
            out.push(line);
        }
    }
    out.join("\n")
}

fn format_mb_short(bytes: u64) -> String {
    format!("{}MB", bytes / (1024 * 1024))
}

/// Progress indicator for the file in flight.
pub fn render_processing(session: &Session, style: Style) -> String {
    match processing_message(session) {
        Some(message) => format!("{} {}", style.cyan("◆"), style.bold(&message)),
        None => format!("{} {}", style.cyan("◆"), processing_step(0)),
    }
}

/// Structured review of every record, followed by the confirm label.
pub fn render_review(session: &Session, style: Style, options: ReviewOptions) -> String {
    let total = session.analysis_results.len();
    let mut out = vec![style.bold(&format!("Review {total} analysed document(s)"))];

    for (i, record) in session.analysis_results.iter().enumerate() {
        out.push(String::new());
        out.push(render_record(record, i + 1, total, style, options));
    }

    out.push(String::new());
    out.push(style.bold(&confirm_label(total)));
    out.join("\n")
}

fn render_record(
    record: &AnalysisRecord,
    index: usize,
    total: usize,
    style: Style,
    options: ReviewOptions,
) -> String {
    let meta = &record.metadata;
    let mut out = vec![
        format!(
            "{} {}  {}",
            style.cyan(&format!("[{index}/{total}]")),
            style.bold(&meta.file_name),
            style.dim(&format_mb(meta.file_size))
        ),
        format!("  Company:   {}", or_unknown(&meta.company)),
        format!("  Contact:   {}", or_unknown(&meta.contact_person)),
        format!("  Date:      {}", or_unknown(&meta.document_date)),
        String::new(),
        format!("  {}", style.bold("Executive summary")),
        format!("    {}", or_unknown(&record.executive_summary)),
    ];

    let sections: [(&str, &[String]); 7] = [
        ("Objectives", &record.brief_objectives),
        ("Requirements", &record.requirements),
        ("In scope", &record.scope.in_scope),
        ("Out of scope", &record.scope.out_of_scope),
        ("Costs", &record.economic_proposal.costs),
        ("Timelines", &record.economic_proposal.timelines),
        ("Resources", &record.economic_proposal.resources),
    ];
    for (title, items) in sections {
        out.push(format!("  {}", style.bold(title)));
        out.push(render_list(items, style));
    }

    out.push(format!("  {}", style.bold("Full text")));
    out.push(render_full_text(&record.full_text, style, options));
    out.join("\n")
}

fn or_unknown(s: &str) -> &str {
    if s.trim().is_empty() {
        "—"
    } else {
        s
    }
}

fn render_list(items: &[String], style: Style) -> String {
    if items.is_empty() {
        return format!("    {}", style.dim(NONE_SPECIFIED));
    }
    items
        .iter()
        .map(|item| format!("    - {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_full_text(text: &str, style: Style, options: ReviewOptions) -> String {
    if text.trim().is_empty() {
        return format!("    {}", style.dim(NO_TEXT));
    }
    let total = text.chars().count();
    if options.full_text || total <= FULL_TEXT_PREVIEW_CHARS {
        return indent(text);
    }
    let preview: String = text.chars().take(FULL_TEXT_PREVIEW_CHARS).collect();
    format!(
        "{}…\n    {}",
        indent(preview.trim_end()),
        style.dim(&format!(
            "({} more characters; pass --full-text to show all)",
            total - FULL_TEXT_PREVIEW_CHARS
        ))
    )
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("    {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Success screen, with the webhook's acknowledgement when it sent one.
pub fn render_success(session: &Session, style: Style, result_url: Option<&str>) -> String {
    let mut out = vec![format!(
        "{} {}",
        style.green("✔"),
        style.bold("Summaries sent successfully")
    )];
    out.push(format!(
        "  {} document(s) delivered",
        session.analysis_results.len()
    ));
    if let Some(ack) = &session.delivery_ack {
        let pretty = serde_json::to_string_pretty(ack).unwrap_or_else(|_| ack.to_string());
        out.push(format!("  {}", style.bold("Response")));
        out.push(indent(&pretty));
    }
    if let Some(url) = result_url {
        out.push(format!("  View results: {}", style.cyan(url)));
    }
    out.join("\n")
}

/// Error screen with the surfaced message.
pub fn render_error(session: &Session, style: Style) -> String {
    let message = session
        .error_message
        .as_deref()
        .unwrap_or("An unknown error occurred.");
    format!(
        "{} {}\n  {}\n  {}",
        style.red("✘"),
        style.bold("Something went wrong"),
        style.red(message),
        style.dim("Try Again: start a new session and select the files again.")
    )
}
