//! Uploaded files and the checks applied to them before any content is read.

use crate::config::IngestConfig;
use std::fmt;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::Path;
use thiserror::Error;

/// Byte source with seek support. Blanket-implemented for every `Read + Seek`.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// Reasons a single file is rejected. The file is skipped and the rest of
/// the batch continues.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("File type '{extension}' not allowed. Allowed types: {allowed}")]
    UnsupportedExtension { extension: String, allowed: String },

    #[error("File is empty")]
    Empty,

    #[error("File too large ({size} bytes). Maximum size: {}MB", megabytes(.max))]
    TooLarge { size: u64, max: u64 },

    #[error("Invalid filename")]
    InvalidFilename,

    #[error("Could not inspect file: {0}")]
    Io(#[from] std::io::Error),
}

/// A file handed to the ingestion pipeline.
///
/// `name` is the client-supplied file name and `content_type` the declared
/// MIME type. Neither is trusted: the name is checked for path traversal and
/// the type only selects an extractor.
pub struct Upload {
    pub name: String,
    pub content_type: String,
    content: Box<dyn ReadSeek>,
}

impl Upload {
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        content: impl ReadSeek + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            content: Box::new(content),
        }
    }

    pub fn from_bytes(
        name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self::new(name, content_type, Cursor::new(bytes.into()))
    }

    /// Opens a local file as an upload, naming it by its basename and
    /// declaring its content type from the extension.
    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let content_type = content_type_for(&name).unwrap_or("application/octet-stream");
        let file = std::fs::File::open(path)?;

        Ok(Self::new(name, content_type, file))
    }

    /// Lowercase extension including the leading dot, or an empty string.
    pub fn extension(&self) -> String {
        Path::new(&self.name)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
            .unwrap_or_default()
    }

    /// Size in bytes, measured by seeking. The read position is rewound.
    pub fn size(&mut self) -> std::io::Result<u64> {
        let size = self.content.seek(SeekFrom::End(0))?;
        self.content.seek(SeekFrom::Start(0))?;
        Ok(size)
    }

    /// Reads the whole content from the start.
    pub fn read_all(&mut self) -> std::io::Result<Vec<u8>> {
        self.content.seek(SeekFrom::Start(0))?;
        let mut bytes = Vec::new();
        self.content.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    /// Applies the extension, size, and filename checks, in that order.
    pub fn validate(&mut self, config: &IngestConfig) -> Result<(), ValidationError> {
        let extension = self.extension();
        let allowed = extension
            .strip_prefix('.')
            .is_some_and(|ext| config.allowed_extensions.iter().any(|a| a == ext));
        if !allowed {
            return Err(ValidationError::UnsupportedExtension {
                extension,
                allowed: config
                    .allowed_extensions
                    .iter()
                    .map(|ext| format!(".{}", ext))
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }

        let size = self.size()?;
        if size > config.max_file_size {
            return Err(ValidationError::TooLarge {
                size,
                max: config.max_file_size,
            });
        }
        if size == 0 {
            return Err(ValidationError::Empty);
        }

        if !is_safe_filename(&self.name) {
            return Err(ValidationError::InvalidFilename);
        }

        Ok(())
    }
}

impl fmt::Debug for Upload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upload")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

fn megabytes(bytes: &u64) -> String {
    format!("{:.1}", *bytes as f64 / (1024.0 * 1024.0))
}

/// A name is safe when it has no traversal sequence and is its own basename.
fn is_safe_filename(name: &str) -> bool {
    if name.contains("..") || name.contains('\\') {
        return false;
    }

    Path::new(name)
        .file_name()
        .is_some_and(|base| base.to_str() == Some(name))
}

/// Declared content type for the extensions this crate can extract.
pub fn content_type_for(name: &str) -> Option<&'static str> {
    let extension = Path::new(name).extension()?.to_str()?.to_lowercase();
    match extension.as_str() {
        "pdf" => Some("application/pdf"),
        "txt" => Some("text/plain"),
        _ => None,
    }
}
