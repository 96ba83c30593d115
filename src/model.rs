//! Form model and wire types exchanged with the content backend.
//!
//! [`FormData`] is what the user fills in. [`GenerateRequest`] is the
//! validated, serialisable snapshot of it that goes over the wire; the only
//! way to obtain one is [`FormData::to_request`], so an incomplete form can
//! never be sent.

use crate::error::{CommunityGenError, ValidationError};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

// ── Form fields ──────────────────────────────────────────────────────────

/// Buyer segment the copy is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetAudience {
    YoungProfessionals,
    Couples,
    Families,
    Investors,
    Retirees,
    Expats,
}

impl TargetAudience {
    pub const ALL: [TargetAudience; 6] = [
        TargetAudience::YoungProfessionals,
        TargetAudience::Couples,
        TargetAudience::Families,
        TargetAudience::Investors,
        TargetAudience::Retirees,
        TargetAudience::Expats,
    ];

    /// Wire tag, e.g. `"young_professionals"`.
    pub fn tag(self) -> &'static str {
        match self {
            TargetAudience::YoungProfessionals => "young_professionals",
            TargetAudience::Couples => "couples",
            TargetAudience::Families => "families",
            TargetAudience::Investors => "investors",
            TargetAudience::Retirees => "retirees",
            TargetAudience::Expats => "expats",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TargetAudience::YoungProfessionals => "Young Professionals / Singles",
            TargetAudience::Couples => "Couples / Newlyweds",
            TargetAudience::Families => "Growing Families",
            TargetAudience::Investors => "Real Estate Investors",
            TargetAudience::Retirees => "Retirees / Seeking a Second Home",
            TargetAudience::Expats => "Expats / International Buyers",
        }
    }
}

/// Tone of the generated copy. Several may be combined.
///
/// Ordering follows declaration order, which is also the order the styles
/// are serialised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritingStyle {
    SeoFriendly,
    Descriptive,
    Narrative,
    Persuasive,
    Informative,
    Testimonial,
    Educational,
}

impl WritingStyle {
    pub const ALL: [WritingStyle; 7] = [
        WritingStyle::SeoFriendly,
        WritingStyle::Descriptive,
        WritingStyle::Narrative,
        WritingStyle::Persuasive,
        WritingStyle::Informative,
        WritingStyle::Testimonial,
        WritingStyle::Educational,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            WritingStyle::SeoFriendly => "seo_friendly",
            WritingStyle::Descriptive => "descriptive",
            WritingStyle::Narrative => "narrative",
            WritingStyle::Persuasive => "persuasive",
            WritingStyle::Informative => "informative",
            WritingStyle::Testimonial => "testimonial",
            WritingStyle::Educational => "educational",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WritingStyle::SeoFriendly => "SEO-friendly",
            WritingStyle::Descriptive => "Descriptive",
            WritingStyle::Narrative => "Narrative",
            WritingStyle::Persuasive => "Persuasive",
            WritingStyle::Informative => "Informative",
            WritingStyle::Testimonial => "Testimonial",
            WritingStyle::Educational => "Educational",
        }
    }
}

/// Output language of the generated copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    English,
    Spanish,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::English, Language::Spanish];

    pub fn tag(self) -> &'static str {
        match self {
            Language::English => "english",
            Language::Spanish => "spanish",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Spanish => "Spanish",
        }
    }
}

/// Which LLM vendor the backend should route the request to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SelectedApi {
    #[default]
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "gemini")]
    Gemini,
}

impl SelectedApi {
    pub const ALL: [SelectedApi; 3] = [SelectedApi::OpenAi, SelectedApi::Anthropic, SelectedApi::Gemini];

    pub fn tag(self) -> &'static str {
        match self {
            SelectedApi::OpenAi => "openai",
            SelectedApi::Anthropic => "anthropic",
            SelectedApi::Gemini => "gemini",
        }
    }

    /// Model family the backend uses for this vendor.
    pub fn label(self) -> &'static str {
        match self {
            SelectedApi::OpenAi => "ChatGPT 3.5",
            SelectedApi::Anthropic => "Claude 3",
            SelectedApi::Gemini => "Gemini Pro",
        }
    }
}

macro_rules! impl_tag_traits {
    ($($ty:ident => $kind:literal),* $(,)?) => {$(
        impl FromStr for $ty {
            type Err = CommunityGenError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim();
                $ty::ALL
                    .iter()
                    .copied()
                    .find(|v| v.tag().eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| CommunityGenError::UnknownTag {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.tag())
            }
        }
    )*};
}

impl_tag_traits! {
    TargetAudience => "target audience",
    WritingStyle => "writing style",
    Language => "language",
    SelectedApi => "API",
}

// ── Entities ─────────────────────────────────────────────────────────────

/// A record extracted from an uploaded document by the backend.
///
/// Its shape belongs to the backend. It is stored and forwarded verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(pub serde_json::Value);

impl Entity {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

impl From<serde_json::Value> for Entity {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

// ── FormData ─────────────────────────────────────────────────────────────

/// A required form field, in the order the form presents them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    CommunityName,
    Location,
    TargetAudience,
    WritingStyle,
    Language,
    Entities,
}

impl Field {
    pub fn label(self) -> &'static str {
        match self {
            Field::CommunityName => "Community Name",
            Field::Location => "Location",
            Field::TargetAudience => "Target Audience",
            Field::WritingStyle => "Writing Style",
            Field::Language => "Language",
            Field::Entities => "Document Entities",
        }
    }
}

/// Everything the user has entered so far, plus the entities returned by
/// the last successful upload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormData {
    pub community_name: String,
    pub location: String,
    pub target_audience: Option<TargetAudience>,
    pub writing_style: BTreeSet<WritingStyle>,
    pub language: Option<Language>,
    pub entities: Vec<Entity>,
    pub selected_api: SelectedApi,
}

impl FormData {
    /// Every required field that is still empty, in form order.
    ///
    /// Text fields holding only whitespace count as empty.
    pub fn missing_fields(&self) -> Vec<Field> {
        let mut missing = Vec::new();
        if self.community_name.trim().is_empty() {
            missing.push(Field::CommunityName);
        }
        if self.location.trim().is_empty() {
            missing.push(Field::Location);
        }
        if self.target_audience.is_none() {
            missing.push(Field::TargetAudience);
        }
        if self.writing_style.is_empty() {
            missing.push(Field::WritingStyle);
        }
        if self.language.is_none() {
            missing.push(Field::Language);
        }
        if self.entities.is_empty() {
            missing.push(Field::Entities);
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Snapshot the form into a request body, or report what is missing.
    pub fn to_request(&self) -> Result<GenerateRequest, ValidationError> {
        let missing = self.missing_fields();
        match (self.target_audience, self.language) {
            (Some(target_audience), Some(language)) if missing.is_empty() => Ok(GenerateRequest {
                community_name: self.community_name.clone(),
                location: self.location.clone(),
                entities: self.entities.clone(),
                target_audience,
                writing_style: self.writing_style.iter().copied().collect(),
                language,
                selected_api: self.selected_api,
            }),
            _ => Err(ValidationError { missing }),
        }
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

/// JSON body of `POST /generate-content/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub community_name: String,
    pub location: String,
    pub entities: Vec<Entity>,
    pub target_audience: TargetAudience,
    pub writing_style: Vec<WritingStyle>,
    pub language: Language,
    #[serde(rename = "selectedAPI")]
    pub selected_api: SelectedApi,
}

/// 2xx body of `POST /extract-info/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractResponse {
    pub entities: Vec<Entity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// First characters of the text the backend pulled out of the document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_language: Option<String>,
}

/// 2xx body of `POST /generate-content/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub generated_text: Option<GeneratedContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Content returned by the generation endpoint.
///
/// Some vendors answer with plain markdown, others with a list of typed
/// content blocks; the variant is chosen while deserialising.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GeneratedContent {
    Markdown(String),
    Blocks(Vec<ContentBlock>),
}

/// One typed unit of generated output. Only `"text"` blocks are rendered.
///
/// Decoding never fails on a single element: a missing or non-string
/// `type` or `text` decodes as an empty string, so the block is skipped
/// instead of rejecting the whole response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

impl<'de> Deserialize<'de> for ContentBlock {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        let field = |name: &str| {
            value
                .get(name)
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Ok(Self {
            kind: field("type"),
            text: field("text"),
        })
    }
}

impl ContentBlock {
    pub const TEXT: &'static str = "text";

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: Self::TEXT.to_string(),
            text: text.into(),
        }
    }

    pub fn is_text(&self) -> bool {
        self.kind == Self::TEXT
    }
}
