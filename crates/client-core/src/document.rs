//! Local document pre-validation.
//!
//! The gateway only accepts PDF and TXT files up to 10 MiB; anything else is
//! rejected here, before a single byte goes over the wire.

use std::path::{Path, PathBuf};

/// Maximum accepted document size in bytes (10 MiB).
pub const MAX_DOCUMENT_BYTES: u64 = 10 * 1024 * 1024;

/// Accepted document formats, decided by file extension (case-insensitive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Txt,
}

impl DocumentKind {
    /// Detect the kind from a filename extension, if it is an accepted one.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = Path::new(filename).extension()?.to_str()?;
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "txt" => Some(DocumentKind::Txt),
            _ => None,
        }
    }

    /// MIME type sent with the multipart upload.
    pub fn mime(self) -> &'static str {
        match self {
            DocumentKind::Pdf => "application/pdf",
            DocumentKind::Txt => "text/plain",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("unsupported file type {extension:?} (accepted: pdf, txt)")]
    UnsupportedType { extension: String },
    #[error("file too large: {size} bytes (maximum {max} bytes)")]
    TooLarge { size: u64, max: u64 },
    #[error("file is empty: {path}")]
    Empty { path: PathBuf },
    #[error("failed to read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A validated document, loaded into memory and ready for submission.
#[derive(Debug, Clone)]
pub struct DocumentFile {
    pub filename: String,
    pub kind: DocumentKind,
    pub bytes: Vec<u8>,
}

impl DocumentFile {
    /// Read and validate a document from disk.
    ///
    /// Size is checked against the metadata before the file is read, so an
    /// oversized file is never pulled into memory.
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let kind = check_candidate(&filename, file_size(path)?)?;

        let bytes = std::fs::read(path).map_err(|source| DocumentError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        if bytes.is_empty() {
            return Err(DocumentError::Empty {
                path: path.to_path_buf(),
            });
        }

        Ok(Self {
            filename,
            kind,
            bytes,
        })
    }
}

fn file_size(path: &Path) -> Result<u64, DocumentError> {
    let meta = std::fs::metadata(path).map_err(|source| DocumentError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(meta.len())
}

/// Validate a candidate by name and size alone.
pub fn check_candidate(filename: &str, size: u64) -> Result<DocumentKind, DocumentError> {
    let kind = DocumentKind::from_filename(filename).ok_or_else(|| {
        let extension = Path::new(filename)
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        DocumentError::UnsupportedType { extension }
    })?;

    if size > MAX_DOCUMENT_BYTES {
        return Err(DocumentError::TooLarge {
            size,
            max: MAX_DOCUMENT_BYTES,
        });
    }

    Ok(kind)
}
