//! Typed values exchanged with callers: blocks, slides, decks, citations and
//! the request shapes for the three public operations.
//!
//! Wire names are camelCase. A [`Block`] serialises as `{ id, type, data }`
//! with `type` selecting the [`BlockContent`] variant, so renderers dispatch
//! on the enum instead of inspecting untyped JSON.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Closed set of block variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockKind {
    Text,
    Paragraph,
    Quote,
    Callout,
    TwoColumn,
    Timeline,
    Evidence,
    Divider,
    SectionHeader,
    Image,
}

impl BlockKind {
    pub const ALL: [BlockKind; 10] = [
        BlockKind::Text,
        BlockKind::Paragraph,
        BlockKind::Quote,
        BlockKind::Callout,
        BlockKind::TwoColumn,
        BlockKind::Timeline,
        BlockKind::Evidence,
        BlockKind::Divider,
        BlockKind::SectionHeader,
        BlockKind::Image,
    ];

    /// Wire tag, as it appears in `blocks[].type`.
    pub fn tag(&self) -> &'static str {
        match self {
            BlockKind::Text => "text",
            BlockKind::Paragraph => "paragraph",
            BlockKind::Quote => "quote",
            BlockKind::Callout => "callout",
            BlockKind::TwoColumn => "twoColumn",
            BlockKind::Timeline => "timeline",
            BlockKind::Evidence => "evidence",
            BlockKind::Divider => "divider",
            BlockKind::SectionHeader => "sectionHeader",
            BlockKind::Image => "image",
        }
    }

    pub fn from_tag(tag: &str) -> Option<BlockKind> {
        BlockKind::ALL.into_iter().find(|k| k.tag() == tag)
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CalloutVariant {
    #[default]
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DividerStyle {
    #[default]
    Solid,
    Dotted,
    Gradient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImageLayout {
    #[default]
    Center,
    FloatLeft,
    FloatRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImageSize {
    Small,
    #[default]
    Medium,
    Large,
}

/// Bullet points.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextPayload {
    pub points: Vec<String>,
}

/// A single paragraph, possibly carrying inline emphasis markers.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParagraphPayload {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuotePayload {
    pub quote: String,
    pub citation: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CalloutPayload {
    pub title: String,
    pub description: String,
    pub variant: CalloutVariant,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwoColumnPayload {
    pub left_title: String,
    pub right_title: String,
    pub left_points: Vec<String>,
    pub right_points: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub date: String,
    pub event: String,
}

/// Events in the order the author gave them; chronology is not enforced.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TimelinePayload {
    pub events: Vec<TimelineEvent>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidencePayload {
    pub evidence_name: String,
    pub summary: String,
    pub citation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DividerPayload {
    pub style: DividerStyle,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SectionHeaderPayload {
    pub title: String,
}

/// An image, or a placeholder carrying search keywords for the image
/// subsystem to resolve later.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    pub caption: String,
    pub layout: ImageLayout,
    pub size: ImageSize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_keywords: Option<Vec<String>>,
}

impl ImagePayload {
    pub fn is_placeholder(&self) -> bool {
        self.placeholder.unwrap_or(false)
    }
}

/// Block payload tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum BlockContent {
    Text(TextPayload),
    Paragraph(ParagraphPayload),
    Quote(QuotePayload),
    Callout(CalloutPayload),
    TwoColumn(TwoColumnPayload),
    Timeline(TimelinePayload),
    Evidence(EvidencePayload),
    Divider(DividerPayload),
    SectionHeader(SectionHeaderPayload),
    Image(ImagePayload),
}

fn blank(s: &str) -> bool {
    s.trim().is_empty()
}

fn all_blank(items: &[String]) -> bool {
    items.iter().all(|s| blank(s))
}

impl BlockContent {
    pub fn kind(&self) -> BlockKind {
        match self {
            BlockContent::Text(_) => BlockKind::Text,
            BlockContent::Paragraph(_) => BlockKind::Paragraph,
            BlockContent::Quote(_) => BlockKind::Quote,
            BlockContent::Callout(_) => BlockKind::Callout,
            BlockContent::TwoColumn(_) => BlockKind::TwoColumn,
            BlockContent::Timeline(_) => BlockKind::Timeline,
            BlockContent::Evidence(_) => BlockKind::Evidence,
            BlockContent::Divider(_) => BlockKind::Divider,
            BlockContent::SectionHeader(_) => BlockKind::SectionHeader,
            BlockContent::Image(_) => BlockKind::Image,
        }
    }

    /// True when every string in the payload is blank and every list is
    /// empty or blank. Enum-only payloads (dividers) are never empty, and a
    /// placeholder image still carries meaning.
    pub fn is_empty(&self) -> bool {
        match self {
            BlockContent::Text(p) => all_blank(&p.points),
            BlockContent::Paragraph(p) => blank(&p.text),
            BlockContent::Quote(p) => blank(&p.quote) && blank(&p.citation),
            BlockContent::Callout(p) => blank(&p.title) && blank(&p.description),
            BlockContent::TwoColumn(p) => {
                blank(&p.left_title)
                    && blank(&p.right_title)
                    && all_blank(&p.left_points)
                    && all_blank(&p.right_points)
            }
            BlockContent::Timeline(p) => p
                .events
                .iter()
                .all(|e| blank(&e.date) && blank(&e.event)),
            BlockContent::Evidence(p) => {
                blank(&p.evidence_name)
                    && blank(&p.summary)
                    && blank(&p.citation)
                    && p.image.as_deref().map_or(true, blank)
            }
            BlockContent::Divider(_) => false,
            BlockContent::SectionHeader(p) => blank(&p.title),
            BlockContent::Image(p) => {
                !p.is_placeholder()
                    && p.uri.as_deref().map_or(true, blank)
                    && blank(&p.caption)
                    && p.suggested_keywords.as_deref().map_or(true, all_blank)
            }
        }
    }
}

/// A typed content unit on a slide. `id` is assigned by the post-processor;
/// any id received from a provider is discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub id: String,
    #[serde(flatten)]
    pub content: BlockContent,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Block {
    pub fn new(content: BlockContent) -> Self {
        Self {
            id: String::new(),
            content,
        }
    }

    pub fn kind(&self) -> BlockKind {
        self.content.kind()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slide {
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    pub blocks: Vec<Block>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_images: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    pub title: String,
    pub total_slides: usize,
    pub slides: Vec<Slide>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CitationKind {
    Article,
    Case,
    Act,
    Section,
}

impl CitationKind {
    pub const ALL: [CitationKind; 4] = [
        CitationKind::Article,
        CitationKind::Case,
        CitationKind::Act,
        CitationKind::Section,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            CitationKind::Article => "article",
            CitationKind::Case => "case",
            CitationKind::Act => "act",
            CitationKind::Section => "section",
        }
    }
}

/// A legal authority. `year` may be empty for articles and sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    #[serde(rename = "type")]
    pub kind: CitationKind,
    pub name: String,
    pub year: String,
    pub full_title: String,
    pub summary: String,
    pub relevance: f64,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitationResult {
    pub query: String,
    pub citations: Vec<Citation>,
    pub total_found: usize,
    pub search_time: String,
}

/// Which pipeline a request runs through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskKind {
    Deck,
    Citations,
    CitationDetail,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Deck => "deck",
            TaskKind::Citations => "citations",
            TaskKind::CitationDetail => "citationDetail",
        }
    }
}

/// Optional style guidance. `extra` is ordered so prompts stay deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleHints {
    #[serde(default)]
    pub tone: Option<String>,
    #[serde(default)]
    pub jurisdiction: Option<String>,
    #[serde(default)]
    pub target_slide_count: Option<usize>,
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

/// Internal request shape shared by the prompt assembler and the engine.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub kind: TaskKind,
    pub input: String,
    pub hints: StyleHints,
    pub deadline: Option<tokio::time::Instant>,
}

impl GenerationRequest {
    pub fn new(kind: TaskKind, input: impl Into<String>) -> Self {
        Self {
            kind,
            input: input.into(),
            hints: StyleHints::default(),
            deadline: None,
        }
    }

    pub fn with_hints(mut self, hints: StyleHints) -> Self {
        self.hints = hints;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<tokio::time::Instant>) -> Self {
        self.deadline = deadline;
        self
    }
}

/// Input for `generate_deck`. `deadline_ms` is a budget relative to the call.
#[derive(Debug, Clone, Default)]
pub struct DeckRequest {
    pub input: String,
    pub hints: StyleHints,
    pub deadline_ms: Option<u64>,
}

impl DeckRequest {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CitationQuery {
    pub query: String,
    pub deadline_ms: Option<u64>,
}

impl CitationQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            deadline_ms: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CitationDetailRequest {
    pub name: String,
    pub deadline_ms: Option<u64>,
}

impl CitationDetailRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            deadline_ms: None,
        }
    }
}
