//! Plain-text extraction for the two supported document kinds.
//!
//! The kind is chosen from the file extension (case-insensitive). PDF text
//! comes from `pdf-extract`; TXT files must be valid UTF-8. Extraction never
//! panics: every failure is an [`ExtractError`] and the indexer skips the
//! file.

use std::path::Path;

/// Document kinds the indexer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Txt,
}

impl DocumentKind {
    /// Kind for `path` by extension, or `None` for anything else.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" => Some(Self::Txt),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("{0} is not valid UTF-8")]
    Encoding(String),

    #[error("unsupported file type: {0}")]
    Unsupported(String),
}

/// Extracts text from a document on disk.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<String, ExtractError>;
}

/// Filesystem extractor dispatching on [`DocumentKind`].
#[derive(Debug, Default, Clone, Copy)]
pub struct FileExtractor;

impl TextExtractor for FileExtractor {
    fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        let display = path.display().to_string();
        let kind = DocumentKind::from_path(path)
            .ok_or_else(|| ExtractError::Unsupported(display.clone()))?;

        let bytes = std::fs::read(path).map_err(|source| ExtractError::Io {
            path: display.clone(),
            source,
        })?;

        match kind {
            DocumentKind::Pdf => extract_pdf(&bytes),
            DocumentKind::Txt => String::from_utf8(bytes).map_err(|_| ExtractError::Encoding(display)),
        }
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}
