//! The form session: owned state, validation, and the two backend calls.
//!
//! A [`Session`] is the single owner of a [`FormData`] and of the last
//! [`GeneratedContent`]. Everything that mutates them takes `&mut self`, so
//! one session can never run two uploads or two generations at once.
//!
//! Front-ends learn about progress and user-facing notices through an
//! optional [`SessionObserver`]:
//!
//! ```rust,no_run
//! use community_gen::{
//!     ClientConfig, HttpBackend, Language, Notice, Session, SessionObserver, TargetAudience,
//!     WritingStyle,
//! };
//! use std::sync::Arc;
//!
//! struct Alerts;
//!
//! impl SessionObserver for Alerts {
//!     fn on_notice(&self, notice: &Notice) {
//!         eprintln!("{}", notice.message());
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = HttpBackend::new(ClientConfig::default())?;
//! let mut session = Session::new(Arc::new(backend)).with_observer(Arc::new(Alerts));
//!
//! session.upload_file("brochure.pdf").await?;
//! session.set_community_name("Vista Azul");
//! session.set_location("Cancún");
//! session.set_target_audience(TargetAudience::Families);
//! session.set_writing_style([WritingStyle::Narrative]);
//! session.set_language(Language::English);
//!
//! let content = session.generate().await?;
//! println!("{content:?}");
//! # Ok(())
//! # }
//! ```

use crate::backend::ContentBackend;
use crate::error::{too_large_message, CommunityGenError};
use crate::model::{
    Entity, Field, FormData, GeneratedContent, Language, SelectedApi, TargetAudience, WritingStyle,
};
use crate::render::{self, Block};
use crate::upload::Upload;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

// ── Notices ──────────────────────────────────────────────────────────────

/// A blocking, user-facing message raised by a session action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// `generate()` was called with required fields empty.
    MissingFields(Vec<Field>),
    /// The backend answered 413.
    PayloadTooLarge { limit_bytes: u64 },
    /// Any other generation failure.
    GenerationFailed,
    /// The extraction call failed; entities were left unchanged.
    UploadFailed,
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Notice::MissingFields(_) => {
                "Please fill all the fields before generating content.".to_string()
            }
            Notice::PayloadTooLarge { limit_bytes } => too_large_message(limit_bytes),
            Notice::GenerationFailed => "An error occurred while generating content.".to_string(),
            Notice::UploadFailed => {
                "Unable to extract info from the document. Please try another file.".to_string()
            }
        }
    }
}

// ── Observer ─────────────────────────────────────────────────────────────

/// Receives session events. All methods default to no-ops.
///
/// Must be `Send + Sync`: the session may be driven from any tokio worker.
pub trait SessionObserver: Send + Sync {
    /// Called just before a document is sent for extraction.
    fn on_upload_start(&self, file_name: &str, size_bytes: usize) {
        let _ = (file_name, size_bytes);
    }

    /// Called after the form's entities were replaced by an upload result.
    fn on_entities_extracted(&self, count: usize) {
        let _ = count;
    }

    /// Called when an upload failed. Entities are unchanged.
    fn on_upload_failed(&self, error: &CommunityGenError) {
        let _ = error;
    }

    /// Called once the busy flag is held, just before the request is sent.
    fn on_generation_start(&self) {}

    /// Called after every generation attempt that reached the backend.
    /// The busy flag is already released.
    fn on_generation_complete(&self, success: bool) {
        let _ = success;
    }

    /// A blocking message the user must see.
    fn on_notice(&self, notice: &Notice) {
        let _ = notice;
    }
}

/// Observer that ignores every event.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}

// ── Busy flag ────────────────────────────────────────────────────────────

/// "A generation request is in flight."
///
/// Cheap to clone; clones observe and guard the same flag. Sessions built
/// with [`Session::with_busy_flag`] and the same flag never have more than
/// one generation in flight between them.
#[derive(Debug, Clone, Default)]
pub struct BusyFlag(Arc<AtomicBool>);

impl BusyFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Take the flag, or `None` if it is already held.
    pub fn try_acquire(&self) -> Option<BusyGuard> {
        self.0
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| BusyGuard(Arc::clone(&self.0)))
    }
}

/// Holds a [`BusyFlag`]; releases it on drop, whatever the exit path.
#[derive(Debug)]
pub struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// ── Session ──────────────────────────────────────────────────────────────

/// Form state plus orchestration of the extraction and generation calls.
pub struct Session {
    backend: Arc<dyn ContentBackend>,
    form: FormData,
    generated: Option<GeneratedContent>,
    busy: BusyFlag,
    observer: Option<Arc<dyn SessionObserver>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("backend", &"<dyn ContentBackend>")
            .field("form", &self.form)
            .field("generated", &self.generated)
            .field("busy", &self.busy.is_busy())
            .field("observer", &self.observer.as_ref().map(|_| "<dyn SessionObserver>"))
            .finish()
    }
}

impl Session {
    /// Start with an empty form.
    pub fn new(backend: Arc<dyn ContentBackend>) -> Self {
        Self {
            backend,
            form: FormData::default(),
            generated: None,
            busy: BusyFlag::new(),
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Share a busy flag with other sessions or with a front-end.
    pub fn with_busy_flag(mut self, flag: BusyFlag) -> Self {
        self.busy = flag;
        self
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub fn form(&self) -> &FormData {
        &self.form
    }

    pub fn generated(&self) -> Option<&GeneratedContent> {
        self.generated.as_ref()
    }

    pub fn is_generating(&self) -> bool {
        self.busy.is_busy()
    }

    pub fn busy_flag(&self) -> BusyFlag {
        self.busy.clone()
    }

    /// The current content, rendered.
    pub fn rendered(&self) -> Vec<Block> {
        render::render(self.generated.as_ref())
    }

    // ── Mutators ─────────────────────────────────────────────────────────

    pub fn set_community_name(&mut self, name: impl Into<String>) {
        self.form.community_name = name.into();
    }

    pub fn set_location(&mut self, location: impl Into<String>) {
        self.form.location = location.into();
    }

    pub fn set_target_audience(&mut self, audience: TargetAudience) {
        self.form.target_audience = Some(audience);
    }

    /// Replace the selected styles.
    pub fn set_writing_style(&mut self, styles: impl IntoIterator<Item = WritingStyle>) {
        self.form.writing_style = styles.into_iter().collect();
    }

    /// Add the style if absent, remove it if present.
    pub fn toggle_writing_style(&mut self, style: WritingStyle) {
        if !self.form.writing_style.remove(&style) {
            self.form.writing_style.insert(style);
        }
    }

    pub fn set_language(&mut self, language: Language) {
        self.form.language = Some(language);
    }

    pub fn set_selected_api(&mut self, api: SelectedApi) {
        self.form.selected_api = api;
    }

    pub fn set_entities(&mut self, entities: Vec<Entity>) {
        self.form.entities = entities;
    }

    // ── Upload ───────────────────────────────────────────────────────────

    /// Read a local file and send it for extraction. See [`Session::upload`].
    pub async fn upload_file(&mut self, path: impl AsRef<Path>) -> Result<usize, CommunityGenError> {
        match Upload::from_path(path).await {
            Ok(upload) => self.upload(upload).await,
            Err(e) => {
                self.report_upload_failure(&e);
                Err(e)
            }
        }
    }

    /// Send one document for extraction and store the returned entities.
    ///
    /// Exactly one request is made. On failure the error is logged, the
    /// observer is told, and the form's entities are left as they were.
    /// Returns the number of entities stored.
    pub async fn upload(&mut self, upload: Upload) -> Result<usize, CommunityGenError> {
        if let Some(ref obs) = self.observer {
            obs.on_upload_start(&upload.file_name, upload.len());
        }

        match self.backend.extract(upload).await {
            Ok(response) => {
                debug!("Extraction response: {:?}", response);
                if let Some(ref lang) = response.detected_language {
                    info!("Backend detected document language '{}'", lang);
                }
                let count = response.entities.len();
                self.form.entities = response.entities;
                info!("File successfully uploaded and processed ({} entities)", count);
                if let Some(ref obs) = self.observer {
                    obs.on_entities_extracted(count);
                }
                Ok(count)
            }
            Err(e) => {
                self.report_upload_failure(&e);
                Err(e)
            }
        }
    }

    fn report_upload_failure(&self, e: &CommunityGenError) {
        error!("Unable to extract info: {}", e);
        if let Some(ref obs) = self.observer {
            obs.on_upload_failed(e);
            let notice = match e {
                CommunityGenError::PayloadTooLarge { limit_bytes, .. } => Notice::PayloadTooLarge {
                    limit_bytes: *limit_bytes,
                },
                _ => Notice::UploadFailed,
            };
            obs.on_notice(&notice);
        }
    }

    // ── Generate ─────────────────────────────────────────────────────────

    /// Validate the form and request generated content.
    ///
    /// * Incomplete form: [`Notice::MissingFields`], no request, returns
    ///   [`CommunityGenError::Validation`].
    /// * Busy flag already held: no request, returns
    ///   [`CommunityGenError::GenerationInProgress`].
    /// * Otherwise exactly one request is sent. On success the content is
    ///   stored and returned; on failure the previous content is kept and a
    ///   notice is raised.
    ///
    /// The busy flag is released before this returns, on every path.
    pub async fn generate(&mut self) -> Result<&GeneratedContent, CommunityGenError> {
        let request = match self.form.to_request() {
            Ok(request) => request,
            Err(e) => {
                warn!("Generation blocked: {}", e);
                self.notify(&Notice::MissingFields(e.missing.clone()));
                return Err(e.into());
            }
        };

        let outcome = {
            let Some(_guard) = self.busy.try_acquire() else {
                warn!("Generation blocked: another request is in flight");
                return Err(CommunityGenError::GenerationInProgress);
            };
            if let Some(ref obs) = self.observer {
                obs.on_generation_start();
            }

            match self.backend.generate(&request).await {
                Ok(response) => response.generated_text.ok_or_else(|| {
                    CommunityGenError::MalformedResponse {
                        endpoint: crate::config::GENERATE_PATH.to_string(),
                        detail: "missing field `generated_text`".to_string(),
                    }
                }),
                Err(e) => Err(e),
            }
        };

        match outcome {
            Ok(content) => {
                info!("Content generated successfully");
                if let Some(ref obs) = self.observer {
                    obs.on_generation_complete(true);
                }
                Ok(&*self.generated.insert(content))
            }
            Err(e) => {
                error!("Error generating content: {}", e);
                if let Some(ref obs) = self.observer {
                    obs.on_generation_complete(false);
                }
                let notice = match &e {
                    CommunityGenError::PayloadTooLarge { limit_bytes, .. } => {
                        Notice::PayloadTooLarge {
                            limit_bytes: *limit_bytes,
                        }
                    }
                    _ => Notice::GenerationFailed,
                };
                self.notify(&notice);
                Err(e)
            }
        }
    }

    fn notify(&self, notice: &Notice) {
        if let Some(ref obs) = self.observer {
            obs.on_notice(notice);
        }
    }
}
