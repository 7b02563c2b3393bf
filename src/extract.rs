//! Text extraction for uploaded documents (PDF, plain text).
//!
//! Callers supply bytes plus a content type; this module returns plain UTF-8
//! text. Extraction failures (corrupt or encrypted PDFs, invalid UTF-8) are
//! upstream errors: they are returned as-is and never retried.

use std::path::Path;

use thiserror::Error;
use tracing::debug;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_TEXT: &str = "text/plain";
pub const MIME_MARKDOWN: &str = "text/markdown";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported content-type: {0}")]
    UnsupportedContentType(String),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("document is not valid UTF-8 text: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Extracts plain text from document bytes.
///
/// `content_type` may carry parameters (`text/plain; charset=utf-8`); only
/// the media type is matched.
pub fn extract_text(bytes: &[u8], content_type: &str) -> Result<String, ExtractError> {
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match media_type.as_str() {
        MIME_PDF => extract_pdf(bytes),
        MIME_TEXT | MIME_MARKDOWN => Ok(String::from_utf8(bytes.to_vec())?),
        _ => Err(ExtractError::UnsupportedContentType(content_type.to_string())),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    let text =
        pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))?;
    debug!(bytes = bytes.len(), chars = text.len(), "extracted PDF text");
    Ok(text)
}

/// Guess the content type from a file extension.
pub fn content_type_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some(MIME_PDF),
        "txt" | "text" => Some(MIME_TEXT),
        "md" | "markdown" => Some(MIME_MARKDOWN),
        _ => None,
    }
}

/// Read a file from disk and extract its text.
pub fn load_document(path: &Path) -> Result<String, ExtractError> {
    let content_type = content_type_for_path(path).ok_or_else(|| {
        ExtractError::UnsupportedContentType(format!("unknown file extension: {}", path.display()))
    })?;
    let bytes = std::fs::read(path).map_err(|source| ExtractError::Io {
        path: path.display().to_string(),
        source,
    })?;
    extract_text(&bytes, content_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text() {
        let text = extract_text(b"hello world", "text/plain; charset=utf-8").unwrap();
        assert_eq!(text, "hello world");
    }

    #[test]
    fn test_invalid_utf8() {
        let err = extract_text(&[0xff, 0xfe, 0xfd], MIME_TEXT).unwrap_err();
        assert!(matches!(err, ExtractError::Utf8(_)));
    }

    #[test]
    fn test_unsupported() {
        let err = extract_text(b"x", "image/png").unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedContentType(_)));
    }

    #[test]
    fn test_corrupt_pdf() {
        let err = extract_text(b"definitely not a pdf", MIME_PDF).unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }

    #[test]
    fn test_content_type_for_path() {
        assert_eq!(content_type_for_path(Path::new("a/b.PDF")), Some(MIME_PDF));
        assert_eq!(content_type_for_path(Path::new("notes.txt")), Some(MIME_TEXT));
        assert_eq!(content_type_for_path(Path::new("README.md")), Some(MIME_MARKDOWN));
        assert_eq!(content_type_for_path(Path::new("image.png")), None);
        assert_eq!(content_type_for_path(Path::new("noext")), None);
    }
}
