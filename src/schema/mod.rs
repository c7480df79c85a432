//! # schema: composed top-level schemas
//!
//! Builds the Deck, CitationResult and Citation schemas out of registry
//! fragments and validates raw provider values against them. Each
//! [`ComposedSchema`] carries the typed root node (for validation) and the
//! rendered strict-mode document (for the transport).

pub mod node;
pub mod validate;

use serde_json::Value;

use crate::model::CitationKind;
use crate::registry::BlockRegistry;
use node::{Field, SchemaNode};
pub use validate::SchemaViolation;
use validate::{JsonPath, Validator};

/// Inclusive bounds on the number of slides in a deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlideBounds {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl SlideBounds {
    /// Bounds for decks produced by the engine.
    pub const GENERATED: SlideBounds = SlideBounds {
        min: Some(3),
        max: Some(8),
    };

    /// Caller-supplied decks may have any number of slides.
    pub const UNBOUNDED: SlideBounds = SlideBounds {
        min: None,
        max: None,
    };

    /// Clamp a requested slide count into these bounds.
    pub fn clamp(&self, count: usize) -> usize {
        let count = self.min.map_or(count, |min| count.max(min));
        self.max.map_or(count, |max| count.min(max))
    }
}

#[derive(Debug, Clone)]
pub struct ComposedSchema {
    name: &'static str,
    root: SchemaNode,
    document: Value,
}

impl ComposedSchema {
    fn build(name: &'static str, root: SchemaNode, registry: &BlockRegistry) -> Self {
        let document = root.to_json(registry);
        Self {
            name,
            root,
            document,
        }
    }

    /// Identifier handed to strict-mode providers.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn root(&self) -> &SchemaNode {
        &self.root
    }
}

fn slide_node() -> SchemaNode {
    SchemaNode::object(vec![
        Field::required("title", SchemaNode::non_empty_string()),
        Field::required("subtitle", SchemaNode::string()),
        Field::required("blocks", SchemaNode::array(SchemaNode::Block)),
        Field::optional("suggestedImages", SchemaNode::string_list()),
    ])
}

fn deck_node(bounds: SlideBounds) -> SchemaNode {
    SchemaNode::object(vec![
        Field::required("title", SchemaNode::string()),
        Field::required("totalSlides", SchemaNode::integer(Some(0))),
        Field::required(
            "slides",
            SchemaNode::bounded_array(slide_node(), bounds.min, bounds.max),
        ),
    ])
}

fn citation_node() -> SchemaNode {
    let kinds: Vec<&'static str> = CitationKind::ALL.iter().map(|k| k.tag()).collect();
    SchemaNode::object(vec![
        Field::required("type", SchemaNode::one_of(&kinds)),
        Field::required("name", SchemaNode::non_empty_string()),
        Field::required("year", SchemaNode::string()),
        Field::required("fullTitle", SchemaNode::string()),
        Field::required("summary", SchemaNode::string()),
        Field::required("relevance", SchemaNode::number(Some(0.0), Some(100.0))),
        Field::required("url", SchemaNode::string()),
    ])
}

fn citation_result_node() -> SchemaNode {
    SchemaNode::object(vec![
        Field::required("query", SchemaNode::string()),
        Field::required("citations", SchemaNode::array(citation_node())),
        Field::required("totalFound", SchemaNode::integer(Some(0))),
        Field::required("searchTime", SchemaNode::string()),
    ])
}

/// Owns the registry and the composed schemas derived from it. Immutable
/// after construction.
pub struct SchemaComposer {
    registry: BlockRegistry,
    deck: ComposedSchema,
    citation_result: ComposedSchema,
    citation: ComposedSchema,
}

impl Default for SchemaComposer {
    fn default() -> Self {
        Self::new(BlockRegistry::standard())
    }
}

impl SchemaComposer {
    pub fn new(registry: BlockRegistry) -> Self {
        let deck = ComposedSchema::build("deck", deck_node(SlideBounds::GENERATED), &registry);
        let citation_result =
            ComposedSchema::build("citation_result", citation_result_node(), &registry);
        let citation = ComposedSchema::build("citation", citation_node(), &registry);
        Self {
            registry,
            deck,
            citation_result,
            citation,
        }
    }

    pub fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    /// Schema for engine-generated decks (3 to 8 slides).
    pub fn deck_schema(&self) -> &ComposedSchema {
        &self.deck
    }

    /// Deck schema with caller-chosen slide bounds, e.g.
    /// [`SlideBounds::UNBOUNDED`] for decks edited by hand.
    pub fn deck_schema_with(&self, bounds: SlideBounds) -> ComposedSchema {
        ComposedSchema::build("deck", deck_node(bounds), &self.registry)
    }

    pub fn citation_result_schema(&self) -> &ComposedSchema {
        &self.citation_result
    }

    /// Shape returned by citation detail requests.
    pub fn citation_schema(&self) -> &ComposedSchema {
        &self.citation
    }

    /// Validate `value`, reporting the first offending path.
    pub fn validate(&self, value: &Value, schema: &ComposedSchema) -> Result<(), SchemaViolation> {
        match self.validate_all(value, schema).into_iter().next() {
            Some(first) => Err(first),
            None => Ok(()),
        }
    }

    pub fn validate_all(&self, value: &Value, schema: &ComposedSchema) -> Vec<SchemaViolation> {
        Validator::new(&self.registry).check(&schema.root, value, &JsonPath::root())
    }
}
