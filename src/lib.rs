//! # community-gen
//!
//! Client for a real-estate community content generator.
//!
//! A user uploads a brochure or fact sheet, the backend extracts structured
//! entities from it, and the user fills a short form (community name,
//! location, audience, writing styles, language, vendor model). The backend
//! then writes marketing copy, which this crate renders into structured
//! blocks for HTML or terminal display.
//!
//! ## Flow
//!
//! ```text
//! file ──POST /extract-info/ (multipart "file")──▶ entities
//!                                                    │
//! form fields + entities ──validate──▶ POST /generate-content/ (JSON)
//!                                                    │
//!                                   generated_text ──▶ render ──▶ Vec<Block>
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use community_gen::{
//!     render, to_terminal, ClientConfig, HttpBackend, Language, Session, TargetAudience,
//!     WritingStyle,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::builder().base_url("http://localhost:8000").build()?;
//!     let mut session = Session::new(Arc::new(HttpBackend::new(config)?));
//!
//!     session.upload_file("brochure.pdf").await?;
//!     session.set_community_name("Vista Azul");
//!     session.set_location("Cancún");
//!     session.set_target_audience(TargetAudience::Investors);
//!     session.set_writing_style([WritingStyle::SeoFriendly, WritingStyle::Persuasive]);
//!     session.set_language(Language::Spanish);
//!
//!     let content = session.generate().await?;
//!     print!("{}", to_terminal(&render(Some(content)), false));
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `community-gen` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! community-gen = { version = "0.4", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod config;
pub mod error;
pub mod model;
pub mod render;
pub mod session;
pub mod upload;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backend::{ContentBackend, HttpBackend};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{CommunityGenError, ValidationError};
pub use model::{
    ContentBlock, Entity, ExtractResponse, Field, FormData, GenerateRequest, GenerateResponse,
    GeneratedContent, Language, SelectedApi, TargetAudience, WritingStyle,
};
pub use render::{render, render_markdown, to_html, to_terminal, Block, ListItem, Style};
pub use session::{BusyFlag, BusyGuard, NoopObserver, Notice, Session, SessionObserver};
pub use upload::Upload;
