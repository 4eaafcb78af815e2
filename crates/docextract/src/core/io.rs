//! Document handles and loading.
//!
//! A [`DocumentHandle`] is the caller's immutable reference to input content.
//! Loading it yields a [`Document`], the bytes plus detected format that every
//! extractor receives.

use crate::core::formats::FormatTag;
use crate::{DocExtractError, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;

/// Where the content of a handle lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    Bytes(Arc<[u8]>),
    Path(PathBuf),
}

/// Immutable reference to input content with an optional name hint.
///
/// The name hint (`report.pdf`) is only used for extension fallback during
/// format detection. Path handles default it to the file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHandle {
    source: DocumentSource,
    name_hint: Option<String>,
}

impl DocumentHandle {
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            source: DocumentSource::Bytes(bytes.into()),
            name_hint: None,
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let name_hint = path.file_name().map(|n| n.to_string_lossy().into_owned());
        Self {
            source: DocumentSource::Path(path),
            name_hint,
        }
    }

    /// Replace the declared name used for extension fallback.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name_hint = Some(name.into());
        self
    }

    pub fn source(&self) -> &DocumentSource {
        &self.source
    }

    pub fn name_hint(&self) -> Option<&str> {
        self.name_hint.as_deref()
    }

    /// Read the content, touching the file system only for path sources.
    ///
    /// # Errors
    ///
    /// Returns `DocExtractError::Io` for I/O errors (these always bubble up).
    pub async fn read(&self) -> Result<Arc<[u8]>> {
        match &self.source {
            DocumentSource::Bytes(bytes) => Ok(Arc::clone(bytes)),
            DocumentSource::Path(path) => {
                let bytes = fs::read(path).await.map_err(DocExtractError::from)?;
                Ok(Arc::from(bytes))
            }
        }
    }
}

impl From<Vec<u8>> for DocumentHandle {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<&[u8]> for DocumentHandle {
    fn from(bytes: &[u8]) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<Arc<[u8]>> for DocumentHandle {
    fn from(bytes: Arc<[u8]>) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<PathBuf> for DocumentHandle {
    fn from(path: PathBuf) -> Self {
        Self::from_path(path)
    }
}

impl From<&Path> for DocumentHandle {
    fn from(path: &Path) -> Self {
        Self::from_path(path)
    }
}

impl From<&str> for DocumentHandle {
    /// Strings are treated as file paths.
    fn from(path: &str) -> Self {
        Self::from_path(path)
    }
}

/// Loaded content handed to extractors.
#[derive(Debug, Clone)]
pub struct Document {
    pub content: Arc<[u8]>,
    pub name: Option<String>,
    pub format: FormatTag,
}

impl Document {
    pub fn new(content: Arc<[u8]>, name: Option<String>, format: FormatTag) -> Self {
        Self { content, name, format }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.content
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}
