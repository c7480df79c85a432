//! # registry: the block schema registry
//!
//! Single source of truth for every block variant. Each [`BlockKind`] has
//! exactly one entry carrying its prompt description, default payload and
//! payload schema; the JSON fragment and the validator are both derived from
//! that schema.
//!
//! ## Adding a kind
//! - Add the variant to [`BlockKind`] and its payload to [`BlockContent`].
//! - Add the arm in [`entry_for`]. The match is exhaustive, so the compiler
//!   refuses a kind without all of its capabilities.

use serde_json::Value;

use crate::model::{
    BlockContent, BlockKind, CalloutPayload, DividerPayload, EvidencePayload, ImagePayload,
    ParagraphPayload, QuotePayload, SectionHeaderPayload, TextPayload, TimelineEvent,
    TimelinePayload, TwoColumnPayload,
};
use crate::schema::node::{Field, SchemaNode};
use crate::schema::validate::{JsonPath, SchemaViolation, Validator};

struct KindEntry {
    kind: BlockKind,
    description: &'static str,
    default_payload: BlockContent,
    schema: SchemaNode,
}

/// Immutable after construction; share it by reference.
pub struct BlockRegistry {
    entries: Vec<KindEntry>,
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl BlockRegistry {
    /// The registry holding every built-in block kind.
    pub fn standard() -> Self {
        Self {
            entries: BlockKind::ALL.into_iter().map(entry_for).collect(),
        }
    }

    fn entry(&self, kind: BlockKind) -> &KindEntry {
        // entries are built in BlockKind::ALL order, which is declaration order
        &self.entries[kind as usize]
    }

    pub fn kinds(&self) -> impl Iterator<Item = BlockKind> + '_ {
        self.entries.iter().map(|e| e.kind)
    }

    /// One-line description used in prompts.
    pub fn describe(&self, kind: BlockKind) -> &'static str {
        self.entry(kind).description
    }

    pub fn default_payload(&self, kind: BlockKind) -> BlockContent {
        self.entry(kind).default_payload.clone()
    }

    pub fn payload_node(&self, kind: BlockKind) -> &SchemaNode {
        &self.entry(kind).schema
    }

    /// Strict-mode JSON Schema fragment for the payload of `kind`.
    pub fn payload_schema(&self, kind: BlockKind) -> Value {
        self.payload_node(kind).to_json(self)
    }

    /// Check a raw `data` value against the fragment for `kind`.
    pub fn validate_payload(&self, kind: BlockKind, value: &Value) -> Result<(), Vec<SchemaViolation>> {
        let errors = Validator::new(self).check(self.payload_node(kind), value, &JsonPath::root());
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// The `data` half of a serialised block.
pub fn payload_value(content: &BlockContent) -> Value {
    match serde_json::to_value(content) {
        Ok(Value::Object(mut map)) => map.remove("data").unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn entry_for(kind: BlockKind) -> KindEntry {
    use SchemaNode as S;

    let (description, default_payload, schema) = match kind {
        BlockKind::Text => (
            "Bullet list; `points` is an ordered list of short statements.",
            BlockContent::Text(TextPayload {
                points: vec![String::new()],
            }),
            S::object(vec![Field::required("points", S::string_list())]),
        ),
        BlockKind::Paragraph => (
            "Prose paragraph in `text`; may use inline emphasis markers.",
            BlockContent::Paragraph(ParagraphPayload::default()),
            S::object(vec![Field::required("text", S::string())]),
        ),
        BlockKind::Quote => (
            "Verbatim quotation in `quote` with its source in `citation`.",
            BlockContent::Quote(QuotePayload::default()),
            S::object(vec![
                Field::required("quote", S::string()),
                Field::required("citation", S::string()),
            ]),
        ),
        BlockKind::Callout => (
            "Highlighted note with `title`, `description` and `variant` (info, warning, critical).",
            BlockContent::Callout(CalloutPayload::default()),
            S::object(vec![
                Field::required("title", S::string()),
                Field::required("description", S::string()),
                Field::required("variant", S::one_of(&["info", "warning", "critical"])),
            ]),
        ),
        BlockKind::TwoColumn => (
            "Side-by-side comparison: `leftTitle`/`leftPoints` against `rightTitle`/`rightPoints`.",
            BlockContent::TwoColumn(TwoColumnPayload {
                left_points: vec![String::new()],
                right_points: vec![String::new()],
                ..Default::default()
            }),
            S::object(vec![
                Field::required("leftTitle", S::string()),
                Field::required("rightTitle", S::string()),
                Field::required("leftPoints", S::string_list()),
                Field::required("rightPoints", S::string_list()),
            ]),
        ),
        BlockKind::Timeline => (
            "Dated sequence of `events`, each with `date` and `event`.",
            BlockContent::Timeline(TimelinePayload {
                events: vec![TimelineEvent::default()],
            }),
            S::object(vec![Field::required(
                "events",
                S::array(S::object(vec![
                    Field::required("date", S::string()),
                    Field::required("event", S::string()),
                ])),
            )]),
        ),
        BlockKind::Evidence => (
            "Exhibit card: `evidenceName`, `summary`, `citation` and an `image` URI (empty string if none).",
            BlockContent::Evidence(EvidencePayload::default()),
            S::object(vec![
                Field::required("evidenceName", S::string()),
                Field::required("summary", S::string()),
                Field::required("citation", S::string()),
                Field::optional("image", S::string()),
            ]),
        ),
        BlockKind::Divider => (
            "Visual separator with `style` (solid, dotted, gradient).",
            BlockContent::Divider(DividerPayload::default()),
            S::object(vec![Field::required(
                "style",
                S::one_of(&["solid", "dotted", "gradient"]),
            )]),
        ),
        BlockKind::SectionHeader => (
            "Section heading in `title`.",
            BlockContent::SectionHeader(SectionHeaderPayload::default()),
            S::object(vec![Field::required("title", S::string())]),
        ),
        BlockKind::Image => (
            "Image with `uri`, `caption`, `layout` and `size`. Prefer listing search keywords in the slide's `suggestedImages` instead.",
            BlockContent::Image(ImagePayload::default()),
            S::object(vec![
                Field::optional("uri", S::string()),
                Field::required("caption", S::string()),
                Field::required("layout", S::one_of(&["center", "floatLeft", "floatRight"])),
                Field::required("size", S::one_of(&["small", "medium", "large"])),
                Field::optional("placeholder", S::boolean()),
                Field::optional("suggestedKeywords", S::string_list()),
            ]),
        ),
    };

    KindEntry {
        kind,
        description,
        default_payload,
        schema,
    }
}
