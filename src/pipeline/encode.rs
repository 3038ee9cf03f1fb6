//! Transport encoding: file bytes → standard base64.
//!
//! The analysis request is JSON, so the PDF travels as a base64 string. A
//! multi-megabyte PDF takes long enough to encode that it runs on the
//! blocking pool rather than stalling the executor, which also makes the
//! encode an await point the controller passes through before the request.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

/// Encode `bytes` as standard (padded) base64.
pub fn encode_bytes(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Encode `bytes` on the blocking pool.
pub async fn encode_bytes_async(bytes: Vec<u8>) -> Result<String, tokio::task::JoinError> {
    let len = bytes.len();
    let b64 = tokio::task::spawn_blocking(move || encode_bytes(&bytes)).await?;
    debug!("Encoded {} bytes → {} bytes base64", len, b64.len());
    Ok(b64)
}
