//! Input resolution: turn user-supplied paths into [`InputFile`]s.
//!
//! The declared media type is guessed from the file extension, the same
//! information a browser's file picker reports. Content is not sniffed here;
//! whether the selection is acceptable is the validator's decision.

use crate::error::IntakeError;
use crate::record::InputFile;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolve every path, preserving order. Fails on the first unreadable path.
pub async fn resolve_inputs<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<InputFile>, IntakeError> {
    let mut files = Vec::with_capacity(paths.len());
    for p in paths {
        files.push(resolve_local(p.as_ref()).await?);
    }
    Ok(files)
}

/// Resolve a local file path into an [`InputFile`] with name, type and size.
pub async fn resolve_local(path: &Path) -> Result<InputFile, IntakeError> {
    let meta = match tokio::fs::metadata(path).await {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            return Err(IntakeError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(IntakeError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    };
    if !meta.is_file() {
        return Err(IntakeError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    // Opening proves readability now rather than mid-batch.
    if let Err(e) = tokio::fs::File::open(path).await {
        return Err(if e.kind() == ErrorKind::PermissionDenied {
            IntakeError::PermissionDenied {
                path: path.to_path_buf(),
            }
        } else {
            IntakeError::FileNotFound {
                path: path.to_path_buf(),
            }
        });
    }

    let name = display_name(path);
    let content_type = declared_type(path);
    debug!("Resolved {} as {} ({} bytes)", path.display(), content_type, meta.len());

    Ok(InputFile::on_disk(path, name, content_type, meta.len()))
}

/// Media type implied by the file extension, `application/octet-stream` when
/// unknown.
pub fn declared_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| PathBuf::from(path).display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::PDF_MEDIA_TYPE;

    #[test]
    fn declared_type_from_extension() {
        assert_eq!(declared_type(Path::new("brief.pdf")), PDF_MEDIA_TYPE);
        assert_eq!(declared_type(Path::new("BRIEF.PDF")), PDF_MEDIA_TYPE);
        assert_eq!(declared_type(Path::new("logo.png")), "image/png");
        assert_eq!(
            declared_type(Path::new("no_extension")),
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn resolves_name_type_and_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proposal.pdf");
        std::fs::write(&path, b"%PDF-1.4 hello").unwrap();

        let f = resolve_local(&path).await.unwrap();
        assert_eq!(f.name, "proposal.pdf");
        assert_eq!(f.content_type, PDF_MEDIA_TYPE);
        assert_eq!(f.size, 14);
        assert_eq!(f.path(), Some(path.as_path()));
        assert_eq!(f.read_bytes().await.unwrap(), b"%PDF-1.4 hello");
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_local(&dir.path().join("nope.pdf")).await.unwrap_err();
        assert!(matches!(err, IntakeError::FileNotFound { .. }), "got: {err:?}");
    }

    #[tokio::test]
    async fn directory_is_not_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_local(dir.path()).await.unwrap_err();
        assert!(matches!(err, IntakeError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn resolve_inputs_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.pdf");
        let b = dir.path().join("b.txt");
        std::fs::write(&a, b"%PDF").unwrap();
        std::fs::write(&b, b"text").unwrap();

        let files = resolve_inputs(&[&b, &a]).await.unwrap();
        assert_eq!(files[0].name, "b.txt");
        assert_eq!(files[0].content_type, "text/plain");
        assert_eq!(files[1].name, "a.pdf");
    }
}
