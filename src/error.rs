//! Error types for the community-gen library.
//!
//! Two types reflect two kinds of failure:
//!
//! * [`ValidationError`]: **local, pre-flight**. The form is incomplete, so
//!   no request was sent. Fully recoverable by filling in the listed fields.
//!
//! * [`CommunityGenError`]: everything that can end an upload or a
//!   generation, including a wrapped [`ValidationError`]. Every variant is
//!   terminal for the triggering action only; the session stays usable.

use crate::model::Field;
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the community-gen library.
#[derive(Debug, Error)]
pub enum CommunityGenError {
    // ── Form errors ───────────────────────────────────────────────────────
    /// One or more required fields are empty; nothing was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Another generation request holds the busy flag.
    #[error("A generation request is already in progress")]
    GenerationInProgress,

    /// A string did not name any known option of a form field.
    #[error("Unknown {kind} '{value}'")]
    UnknownTag { kind: &'static str, value: String },

    // ── Upload input errors ───────────────────────────────────────────────
    /// Upload file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    // ── Backend errors ────────────────────────────────────────────────────
    /// The request never produced an HTTP response (connect, DNS, timeout).
    #[error("Request to '{endpoint}' failed: {reason}\nIs the backend running?")]
    Network { endpoint: String, reason: String },

    /// The backend answered HTTP 413.
    #[error("{}", too_large_message(.limit_bytes))]
    PayloadTooLarge { endpoint: String, limit_bytes: u64 },

    /// The extraction endpoint answered with a non-2xx status.
    #[error("Unable to extract info (HTTP {status}): {detail}")]
    UploadFailed { status: u16, detail: String },

    /// The generation endpoint answered with a non-2xx status.
    #[error("Error generating content (HTTP {status}): {detail}")]
    GenerationFailed { status: u16, detail: String },

    /// A 2xx response whose body did not match the expected shape.
    #[error("Malformed response from '{endpoint}': {detail}")]
    MalformedResponse { endpoint: String, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CommunityGenError {
    /// True for the errors raised before any request was sent.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            CommunityGenError::Validation(_)
                | CommunityGenError::GenerationInProgress
                | CommunityGenError::UnknownTag { .. }
                | CommunityGenError::FileNotFound { .. }
                | CommunityGenError::PermissionDenied { .. }
                | CommunityGenError::InvalidConfig(_)
        )
    }
}

/// The form is missing required values.
///
/// `missing` is listed in form order and is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "Please fill all the fields before generating content. Missing: {}",
    field_labels(.missing)
)]
pub struct ValidationError {
    pub missing: Vec<Field>,
}

fn field_labels(fields: &[Field]) -> String {
    fields
        .iter()
        .map(|f| f.label())
        .collect::<Vec<_>>()
        .join(", ")
}

/// User-facing text for an upload over the backend's size limit.
pub(crate) fn too_large_message(limit_bytes: &u64) -> String {
    format!(
        "File too large. Please upload a file less than {}.",
        format_limit(*limit_bytes)
    )
}

fn format_limit(bytes: u64) -> String {
    const MB: u64 = 1024 * 1024;
    if bytes >= MB && bytes % MB == 0 {
        format!("{}MB", bytes / MB)
    } else {
        format!("{bytes} bytes")
    }
}
