//! Text extraction from uploaded documents.
//!
//! Each upload is written to a scoped temporary file, handed to the extractor
//! for its declared kind, and the temporary file is removed when the guard
//! drops, whichever way extraction ends.

use super::upload::Upload;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Reasons extraction of a single file fails. The file is skipped and the
/// rest of the batch continues.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("File is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub type Result<T> = std::result::Result<T, ExtractionError>;

/// The document formats the pipeline can extract text from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    PlainText,
}

impl DocumentKind {
    /// Selects the kind from a declared MIME type. Parameters such as
    /// `; charset=utf-8` are ignored.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type.split(';').next().unwrap_or_default().trim();
        match essence.to_ascii_lowercase().as_str() {
            "application/pdf" => Some(Self::Pdf),
            "text/plain" => Some(Self::PlainText),
            _ => None,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::PlainText => "text/plain",
        }
    }

    /// Extracts the text of a file of this kind.
    pub fn extract(&self, path: &Path) -> Result<String> {
        match self {
            Self::Pdf => extract_pdf(path),
            Self::PlainText => extract_plain_text(path),
        }
    }
}

fn extract_pdf(path: &Path) -> Result<String> {
    // pdf-extract panics on some malformed inputs instead of returning an error.
    match std::panic::catch_unwind(|| pdf_extract::extract_text(path)) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(ExtractionError::Pdf(e.to_string())),
        Err(_) => Err(ExtractionError::Pdf("extractor aborted on malformed input".to_string())),
    }
}

fn extract_plain_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    let text = String::from_utf8(bytes)?;
    Ok(text.strip_prefix('\u{feff}').map(str::to_string).unwrap_or(text))
}

/// Text extracted from one upload.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// The upload's file name.
    pub source_id: String,
    pub kind: DocumentKind,
    pub text: String,
}

/// Extracts uploads through scoped temporary files.
#[derive(Debug, Clone, Default)]
pub struct DocumentLoader {
    temp_dir: Option<PathBuf>,
}

impl DocumentLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places temporary files in `dir` instead of the system temp directory.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Extracts the text of an upload that already passed validation.
    pub fn load(&self, upload: &mut Upload) -> Result<SourceDocument> {
        let kind = DocumentKind::from_content_type(&upload.content_type)
            .ok_or_else(|| ExtractionError::UnsupportedType(upload.content_type.clone()))?;

        let bytes = upload.read_all()?;

        let extension = upload.extension();
        let mut builder = tempfile::Builder::new();
        builder.prefix("docent-upload-").suffix(&extension);
        let mut temp = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        temp.write_all(&bytes)?;
        temp.flush()?;
        debug!(file = %upload.name, temp = %temp.path().display(), "Persisted upload for extraction");

        let text = kind.extract(temp.path())?;

        Ok(SourceDocument {
            source_id: upload.name.clone(),
            kind,
            text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_empty_dir(dir: &Path) -> bool {
        std::fs::read_dir(dir).unwrap().next().is_none()
    }

    #[test]
    fn test_kind_from_content_type() {
        assert_eq!(DocumentKind::from_content_type("application/pdf"), Some(DocumentKind::Pdf));
        assert_eq!(
            DocumentKind::from_content_type("text/plain; charset=utf-8"),
            Some(DocumentKind::PlainText)
        );
        assert_eq!(DocumentKind::from_content_type("text/html"), None);
    }

    #[test]
    fn test_loads_plain_text_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let loader = DocumentLoader::new().with_temp_dir(dir.path());
        let mut upload = Upload::from_bytes("facts.txt", "text/plain", "\u{feff}A is the capital of X.");

        let document = loader.load(&mut upload).unwrap();

        assert_eq!(document.source_id, "facts.txt");
        assert_eq!(document.kind, DocumentKind::PlainText);
        assert_eq!(document.text, "A is the capital of X.");
        assert!(is_empty_dir(dir.path()));
    }

    #[test]
    fn test_invalid_utf8_fails_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let loader = DocumentLoader::new().with_temp_dir(dir.path());
        let mut upload = Upload::from_bytes("bad.txt", "text/plain", vec![0xff, 0xfe, 0x00, 0xc3]);

        let err = loader.load(&mut upload).unwrap_err();

        assert!(matches!(err, ExtractionError::Utf8(_)));
        assert!(is_empty_dir(dir.path()));
    }

    #[test]
    fn test_malformed_pdf_fails_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let loader = DocumentLoader::new().with_temp_dir(dir.path());
        let mut upload = Upload::from_bytes("broken.pdf", "application/pdf", "not really a pdf");

        let err = loader.load(&mut upload).unwrap_err();

        assert!(matches!(err, ExtractionError::Pdf(_)));
        assert!(is_empty_dir(dir.path()));
    }

    #[test]
    fn test_unsupported_type_creates_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let loader = DocumentLoader::new().with_temp_dir(dir.path());
        let mut upload = Upload::from_bytes("page.txt", "text/html", "<p>hi</p>");

        let err = loader.load(&mut upload).unwrap_err();

        assert!(matches!(err, ExtractionError::UnsupportedType(t) if t == "text/html"));
        assert!(is_empty_dir(dir.path()));
    }
}
