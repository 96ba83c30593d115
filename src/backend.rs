//! The seam between the form and the remote content service.
//!
//! [`ContentBackend`] is the only way a [`crate::Session`] reaches the
//! network. [`HttpBackend`] is the production implementation; tests and
//! embedders can supply their own (an in-process fake, a caching layer).
//!
//! Neither call is retried. A failure is returned as-is and the caller
//! decides what the user sees.

use crate::config::{ClientConfig, EXTRACT_PATH, GENERATE_PATH};
use crate::error::CommunityGenError;
use crate::model::{ExtractResponse, GenerateRequest, GenerateResponse};
use crate::upload::Upload;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info};

/// Longest error body quoted verbatim in an error message.
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Remote operations the form depends on.
#[async_trait]
pub trait ContentBackend: Send + Sync {
    /// Send one document for entity extraction.
    async fn extract(&self, upload: Upload) -> Result<ExtractResponse, CommunityGenError>;

    /// Ask the backend to write copy for a complete form.
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, CommunityGenError>;
}

/// [`ContentBackend`] over HTTP, using `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    config: ClientConfig,
}

#[derive(Debug, Deserialize)]
struct VersionResponse {
    version: String,
}

/// Error bodies the backend produces: `{"message": …}` from its own
/// handlers, `{"detail": …}` from framework-level rejections.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    detail: Option<serde_json::Value>,
}

impl HttpBackend {
    pub fn new(config: ClientConfig) -> Result<Self, CommunityGenError> {
        let mut builder = Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout());
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| CommunityGenError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// `GET /`: the version string the backend reports about itself.
    pub async fn version(&self) -> Result<String, CommunityGenError> {
        let url = self.config.endpoint("/");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| network_error(&url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CommunityGenError::MalformedResponse {
                endpoint: url,
                detail: format!("HTTP {status}"),
            });
        }
        let body: VersionResponse = decode_json(&url, response).await?;
        Ok(body.version)
    }
}

#[async_trait]
impl ContentBackend for HttpBackend {
    async fn extract(&self, upload: Upload) -> Result<ExtractResponse, CommunityGenError> {
        let url = self.config.endpoint(EXTRACT_PATH);
        info!("Uploading '{}' ({} bytes) to {}", upload.file_name, upload.len(), url);

        let form = upload.into_form()?;
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| network_error(&url, &e))?;

        let status = response.status();
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            return Err(CommunityGenError::PayloadTooLarge {
                endpoint: url,
                limit_bytes: self.config.max_upload_bytes,
            });
        }
        if !status.is_success() {
            let detail = error_detail(response).await;
            return Err(CommunityGenError::UploadFailed {
                status: status.as_u16(),
                detail,
            });
        }

        let body: ExtractResponse = decode_json(&url, response).await?;
        info!("Extracted {} entities", body.entities.len());
        Ok(body)
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, CommunityGenError> {
        let url = self.config.endpoint(GENERATE_PATH);
        info!(
            "Requesting content for '{}' via {} ({} entities)",
            request.community_name,
            request.selected_api,
            request.entities.len()
        );

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| network_error(&url, &e))?;

        // 413 is inspected on the status itself, before any body decoding.
        let status = response.status();
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            return Err(CommunityGenError::PayloadTooLarge {
                endpoint: url,
                limit_bytes: self.config.max_upload_bytes,
            });
        }
        if !status.is_success() {
            let detail = error_detail(response).await;
            return Err(CommunityGenError::GenerationFailed {
                status: status.as_u16(),
                detail,
            });
        }

        decode_json(&url, response).await
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn network_error(url: &str, e: &reqwest::Error) -> CommunityGenError {
    let reason = if e.is_timeout() {
        "timed out".to_string()
    } else if e.is_connect() {
        format!("connection failed: {e}")
    } else {
        e.to_string()
    };
    debug!("Request to {} failed: {}", url, reason);
    CommunityGenError::Network {
        endpoint: url.to_string(),
        reason,
    }
}

/// Read a 2xx body, logging the raw text before decoding it.
async fn decode_json<T: DeserializeOwned>(url: &str, response: Response) -> Result<T, CommunityGenError> {
    let text = response.text().await.map_err(|e| network_error(url, &e))?;
    debug!("Response from {}: {}", url, text);
    serde_json::from_str(&text).map_err(|e| CommunityGenError::MalformedResponse {
        endpoint: url.to_string(),
        detail: e.to_string(),
    })
}

async fn error_detail(response: Response) -> String {
    let text = response.text().await.unwrap_or_default();
    describe_error_body(&text)
}

/// Best human-readable detail from an error body.
fn describe_error_body(text: &str) -> String {
    if let Ok(body) = serde_json::from_str::<ErrorBody>(text) {
        if let Some(message) = body.message.filter(|m| !m.is_empty()) {
            return message;
        }
        match body.detail {
            Some(serde_json::Value::String(s)) if !s.is_empty() => return s,
            Some(other) if !other.is_null() => return other.to_string(),
            _ => {}
        }
    }

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return "no response body".to_string();
    }
    if trimmed.chars().count() > MAX_ERROR_BODY_CHARS {
        let head: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{head}\u{2026}")
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_prefers_message() {
        let body = r#"{"status": "error", "message": "Invalid API selection"}"#;
        assert_eq!(describe_error_body(body), "Invalid API selection");
    }

    #[test]
    fn error_body_falls_back_to_detail() {
        assert_eq!(
            describe_error_body(r#"{"detail": "Language not supported"}"#),
            "Language not supported"
        );
    }

    #[test]
    fn error_body_structured_detail_is_serialised() {
        let detail = describe_error_body(r#"{"detail": [{"loc": ["body", "location"]}]}"#);
        assert!(detail.contains("location"), "got: {detail}");
    }

    #[test]
    fn error_body_plain_text_is_truncated() {
        let long = "x".repeat(1000);
        let detail = describe_error_body(&long);
        assert_eq!(detail.chars().count(), MAX_ERROR_BODY_CHARS + 1);
        assert!(detail.ends_with('\u{2026}'));
    }

    #[test]
    fn error_body_empty() {
        assert_eq!(describe_error_body("  "), "no response body");
    }

    #[test]
    fn http_backend_builds_from_default_config() {
        let backend = HttpBackend::new(ClientConfig::default()).unwrap();
        assert_eq!(backend.config().base_url, "http://localhost:8000");
    }
}
