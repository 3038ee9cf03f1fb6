//! File validation: only PDFs may be selected.
//!
//! The check is on the *declared* media type, the same signal a browser file
//! picker gives. It keeps obviously wrong uploads from costing an analysis
//! call; it is not a security boundary and the analysis server must still
//! cope with arbitrary bytes.

use crate::error::ValidationError;
use crate::record::{InputFile, PDF_MEDIA_TYPE};

/// Accept `files` unchanged if every file declares exactly the PDF media type.
///
/// An empty selection is valid: it clears the current selection.
/// On failure the error names the first offending file.
pub fn validate_selection(files: Vec<InputFile>) -> Result<Vec<InputFile>, ValidationError> {
    if let Some(bad) = files.iter().find(|f| f.content_type != PDF_MEDIA_TYPE) {
        return Err(ValidationError {
            file_name: bad.name.clone(),
            declared_type: bad.content_type.clone(),
        });
    }
    Ok(files)
}
