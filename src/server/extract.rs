//! Deterministic cleanup of model output before it is parsed as a record.
//!
//! Models are asked for a bare JSON object but occasionally wrap it in a
//! code fence, prepend a sentence, or leak a byte-order mark. Each rule here
//! is a pure `&str → String` pass so it can be tested on its own. No rule
//! looks inside the object: extracted text reaches review as the model wrote
//! it.
//!
//! Rules (applied in order):
//! 1. Strip a leading byte-order mark or zero-width space
//! 2. Strip an outer ```` ```json ```` / ```` ``` ```` fence
//! 3. Cut to the outermost `{ … }` span when prose surrounds it

use crate::record::AnalysisRecord;
use once_cell::sync::Lazy;
use regex::Regex;

/// Clean `raw` and parse it as an [`AnalysisRecord`].
pub fn parse_record(raw: &str) -> Result<AnalysisRecord, serde_json::Error> {
    serde_json::from_str(&clean_json(raw))
}

/// Apply all cleanup rules to raw model output.
pub fn clean_json(raw: &str) -> String {
    let s = strip_leading_marks(raw);
    let s = strip_code_fences(&s);
    outer_object(&s)
}

// ── Rule 1: Strip leading invisible marks ───────────────────────────────────

fn strip_leading_marks(input: &str) -> String {
    input.trim_start_matches(['\u{FEFF}', '\u{200B}']).to_string()
}

// ── Rule 2: Strip outer code fences ─────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```[A-Za-z]*[ \t]*\r?\n(.*?)\r?\n?```\s*$").expect("static regex")
});

fn strip_code_fences(input: &str) -> String {
    let trimmed = input.trim();
    match RE_OUTER_FENCES.captures(trimmed) {
        Some(caps) => caps[1].to_string(),
        None => trimmed.to_string(),
    }
}

// ── Rule 3: Keep only the outermost object ──────────────────────────────────

fn outer_object(input: &str) -> String {
    match (input.find('{'), input.rfind('}')) {
        (Some(start), Some(end)) if start < end => input[start..=end].to_string(),
        _ => input.to_string(),
    }
}
