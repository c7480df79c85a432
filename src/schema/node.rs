//! Typed schema nodes.
//!
//! A [`SchemaNode`] tree is the single description from which both the
//! strict-mode JSON Schema document and the structural validator derive, so
//! the two can never drift apart.

use serde_json::{json, Map, Value};

use crate::registry::BlockRegistry;

#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    String {
        allowed: Option<Vec<&'static str>>,
        min_len: usize,
    },
    Number {
        min: Option<f64>,
        max: Option<f64>,
    },
    Integer {
        min: Option<i64>,
        max: Option<i64>,
    },
    Boolean,
    Array {
        items: Box<SchemaNode>,
        min_items: Option<usize>,
        max_items: Option<usize>,
    },
    Object {
        fields: Vec<Field>,
    },
    /// Polymorphic block: `{ id, type, data }` where `data` is checked
    /// against the registry fragment selected by `type`.
    Block,
}

/// A named property of an object node.
///
/// `optional` fields may be absent (or null) in validated values, but the
/// strict-mode document still lists them as required: strict providers need
/// every property declared and fill the gaps with empty values.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub node: SchemaNode,
    pub optional: bool,
}

impl Field {
    pub fn required(name: &'static str, node: SchemaNode) -> Self {
        Self {
            name,
            node,
            optional: false,
        }
    }

    pub fn optional(name: &'static str, node: SchemaNode) -> Self {
        Self {
            name,
            node,
            optional: true,
        }
    }
}

impl SchemaNode {
    pub fn string() -> Self {
        SchemaNode::String {
            allowed: None,
            min_len: 0,
        }
    }

    pub fn non_empty_string() -> Self {
        SchemaNode::String {
            allowed: None,
            min_len: 1,
        }
    }

    pub fn one_of(values: &[&'static str]) -> Self {
        SchemaNode::String {
            allowed: Some(values.to_vec()),
            min_len: 0,
        }
    }

    pub fn number(min: Option<f64>, max: Option<f64>) -> Self {
        SchemaNode::Number { min, max }
    }

    pub fn integer(min: Option<i64>) -> Self {
        SchemaNode::Integer { min, max: None }
    }

    pub fn boolean() -> Self {
        SchemaNode::Boolean
    }

    pub fn array(items: SchemaNode) -> Self {
        SchemaNode::Array {
            items: Box::new(items),
            min_items: None,
            max_items: None,
        }
    }

    pub fn bounded_array(items: SchemaNode, min: Option<usize>, max: Option<usize>) -> Self {
        SchemaNode::Array {
            items: Box::new(items),
            min_items: min,
            max_items: max,
        }
    }

    pub fn object(fields: Vec<Field>) -> Self {
        SchemaNode::Object { fields }
    }

    pub fn string_list() -> Self {
        SchemaNode::array(SchemaNode::string())
    }

    /// Render as a JSON Schema fragment in the strict dialect:
    /// `additionalProperties: false` and every property in `required`.
    pub fn to_json(&self, registry: &BlockRegistry) -> Value {
        match self {
            SchemaNode::String { allowed, min_len } => {
                let mut out = Map::new();
                out.insert("type".into(), json!("string"));
                if let Some(values) = allowed {
                    out.insert("enum".into(), json!(values));
                }
                if *min_len > 0 {
                    out.insert("minLength".into(), json!(min_len));
                }
                Value::Object(out)
            }
            SchemaNode::Number { min, max } => {
                let mut out = Map::new();
                out.insert("type".into(), json!("number"));
                if let Some(min) = min {
                    out.insert("minimum".into(), json!(min));
                }
                if let Some(max) = max {
                    out.insert("maximum".into(), json!(max));
                }
                Value::Object(out)
            }
            SchemaNode::Integer { min, max } => {
                let mut out = Map::new();
                out.insert("type".into(), json!("integer"));
                if let Some(min) = min {
                    out.insert("minimum".into(), json!(min));
                }
                if let Some(max) = max {
                    out.insert("maximum".into(), json!(max));
                }
                Value::Object(out)
            }
            SchemaNode::Boolean => json!({ "type": "boolean" }),
            SchemaNode::Array {
                items,
                min_items,
                max_items,
            } => {
                let mut out = Map::new();
                out.insert("type".into(), json!("array"));
                out.insert("items".into(), items.to_json(registry));
                if let Some(min) = min_items {
                    out.insert("minItems".into(), json!(min));
                }
                if let Some(max) = max_items {
                    out.insert("maxItems".into(), json!(max));
                }
                Value::Object(out)
            }
            SchemaNode::Object { fields } => {
                let mut properties = Map::new();
                for field in fields {
                    properties.insert(field.name.to_string(), field.node.to_json(registry));
                }
                let required: Vec<&str> = fields.iter().map(|f| f.name).collect();
                json!({
                    "type": "object",
                    "properties": properties,
                    "required": required,
                    "additionalProperties": false,
                })
            }
            SchemaNode::Block => {
                let variants: Vec<Value> = registry
                    .kinds()
                    .map(|kind| {
                        json!({
                            "type": "object",
                            "properties": {
                                "id": { "type": "string" },
                                "type": { "type": "string", "enum": [kind.tag()] },
                                "data": registry.payload_schema(kind),
                            },
                            "required": ["id", "type", "data"],
                            "additionalProperties": false,
                        })
                    })
                    .collect();
                json!({ "anyOf": variants })
            }
        }
    }
}
