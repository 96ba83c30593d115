//! The file reference handed to the extraction endpoint.
//!
//! An [`Upload`] is read fully into memory before anything is sent, so a
//! missing or unreadable file fails locally and never costs a request.

use crate::error::CommunityGenError;
use reqwest::multipart::{Form, Part};
use std::path::Path;
use tracing::debug;

/// Multipart field name the extraction endpoint reads the document from.
pub const FILE_FIELD: &str = "file";

/// A document selected for entity extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    /// Name sent in the part's `Content-Disposition`. The backend only runs
    /// its PDF reader when this ends in `.pdf`.
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a local file.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, CommunityGenError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CommunityGenError::FileNotFound {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::PermissionDenied => CommunityGenError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => CommunityGenError::Internal(format!(
                "Failed to read '{}': {e}",
                path.display()
            )),
        })?;

        let file_name = file_name_of(path);
        debug!("Read upload '{}' ({} bytes)", file_name, bytes.len());
        Ok(Self { file_name, bytes })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// `true` when the name carries a `.pdf` extension.
    pub fn is_pdf(&self) -> bool {
        Path::new(&self.file_name)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
    }

    pub fn mime_type(&self) -> &'static str {
        if self.is_pdf() {
            "application/pdf"
        } else {
            "application/octet-stream"
        }
    }

    /// Build the multipart body: one part named [`FILE_FIELD`].
    pub fn into_form(self) -> Result<Form, CommunityGenError> {
        let mime = self.mime_type();
        let part = Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str(mime)
            .map_err(|e| CommunityGenError::Internal(format!("Invalid MIME type {mime}: {e}")))?;
        Ok(Form::new().part(FILE_FIELD, part))
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "upload.pdf".to_string())
}
