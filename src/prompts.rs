//! Prompts and the structured-output schema for document analysis.
//!
//! Centralising the prompt here keeps the server handler free of prompt text
//! and lets unit tests check the schema against [`crate::AnalysisRecord`]
//! without calling a model.

use serde_json::{json, Value};

/// System prompt sent before every document.
pub const SYSTEM_PROMPT: &str = r#"You are a meticulous analyst of business documents such as project briefs, requests for proposal and economic proposals.

Follow these rules precisely:

1. EXTRACTION
   - First extract the full, raw text of the document, unabridged and in reading order
   - Do not summarise or paraphrase inside the full text field

2. STRUCTURE
   - Fill in every field of the JSON schema you are given
   - Use an empty string for a text field you cannot determine
   - Use an empty list for a list field with nothing to report
   - Infer company, contact person and document date when they are not stated explicitly
   - Write dates as YYYY-MM-DD when the day is known

3. OUTPUT FORMAT
   - Output ONLY a single JSON object matching the schema
   - Do NOT wrap it in ```json fences
   - Do NOT add commentary or explanations"#;

/// JSON schema of an analysis record: seven required top-level fields.
pub fn analysis_schema() -> Value {
    let string_list = |description: &str| {
        json!({ "type": "array", "items": { "type": "string" }, "description": description })
    };

    json!({
        "type": "object",
        "properties": {
            "metadata": {
                "type": "object",
                "properties": {
                    "fileName": { "type": "string", "description": "The original name of the document file." },
                    "fileType": { "type": "string", "description": "The MIME type of the document." },
                    "fileSize": { "type": "number", "description": "The size of the document in bytes." },
                    "company": { "type": "string", "description": "The name of the company that authored the document. Infer if not explicitly stated." },
                    "contactPerson": { "type": "string", "description": "The primary contact person mentioned. Infer if not explicitly stated." },
                    "documentDate": { "type": "string", "description": "The main date of the document (e.g. \"YYYY-MM-DD\"). Infer if not explicitly stated." }
                },
                "required": ["fileName", "fileType", "fileSize", "company", "contactPerson", "documentDate"]
            },
            "executiveSummary": {
                "type": "string",
                "description": "A concise, one-paragraph summary of the document's purpose and key proposals."
            },
            "fullText": {
                "type": "string",
                "description": "The full, complete, and unabridged text content extracted from the document."
            },
            "briefObjectives": string_list("A list of the main goals or objectives stated in the document."),
            "requirements": string_list("A list of key requirements, specifications, or needs outlined."),
            "scope": {
                "type": "object",
                "properties": {
                    "inScope": string_list("Items, tasks, or deliverables explicitly included in the project scope."),
                    "outOfScope": string_list("Items explicitly stated as being outside the project scope.")
                },
                "required": ["inScope", "outOfScope"]
            },
            "economicProposal": {
                "type": "object",
                "properties": {
                    "costs": string_list("All stated costs, fees, or pricing details."),
                    "timelines": string_list("Key dates, deadlines, or timelines mentioned."),
                    "resources": string_list("Resources (personnel, equipment, etc.) mentioned as required.")
                },
                "required": ["costs", "timelines", "resources"]
            }
        },
        "required": [
            "metadata", "executiveSummary", "fullText", "briefObjectives",
            "requirements", "scope", "economicProposal"
        ]
    })
}

/// The user turn that accompanies the document content.
pub fn analysis_prompt(file_name: &str, file_size: u64) -> String {
    let schema = serde_json::to_string_pretty(&analysis_schema()).unwrap_or_default();
    format!(
        "Analyze this document named \"{file_name}\". First, extract the full, raw text content. \
Then, based on the content, provide a structured JSON output. The file size is {file_size} bytes. \
Fill in all fields of the JSON schema accurately.\n\nJSON schema:\n{schema}"
    )
}
