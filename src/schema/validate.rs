//! Structural validation of JSON values against [`SchemaNode`] trees.
//!
//! Violations carry a dotted/indexed path such as
//! `slides[2].blocks[0].data.events[1].date`. The walk is depth-first in
//! field declaration order, so the first violation reported is stable.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

use super::node::{Field, SchemaNode};
use crate::model::BlockKind;
use crate::registry::BlockRegistry;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{path}: expected {expected}")]
pub struct SchemaViolation {
    pub path: String,
    pub expected: String,
}

#[derive(Debug, Clone)]
enum Segment {
    Key(String),
    Index(usize),
}

/// Location inside the value being validated. Renders as `$` at the root.
#[derive(Debug, Clone, Default)]
pub struct JsonPath {
    segments: Vec<Segment>,
}

impl JsonPath {
    pub fn root() -> Self {
        Self::default()
    }

    fn key(&self, key: &str) -> Self {
        let mut next = self.clone();
        next.segments.push(Segment::Key(key.to_string()));
        next
    }

    fn index(&self, index: usize) -> Self {
        let mut next = self.clone();
        next.segments.push(Segment::Index(index));
        next
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("$");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Key(key) if i == 0 => write!(f, "{key}")?,
                Segment::Key(key) => write!(f, ".{key}")?,
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn quoted_list<'a>(values: impl Iterator<Item = &'a str>) -> String {
    values
        .map(|v| format!("\"{v}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Walks values against schema nodes, dispatching polymorphic blocks through
/// the registry.
pub struct Validator<'r> {
    registry: &'r BlockRegistry,
}

impl<'r> Validator<'r> {
    pub fn new(registry: &'r BlockRegistry) -> Self {
        Self { registry }
    }

    /// Collect every violation of `value` against `node`.
    pub fn check(&self, node: &SchemaNode, value: &Value, path: &JsonPath) -> Vec<SchemaViolation> {
        let mut out = Vec::new();
        self.visit(node, value, path, &mut out);
        out
    }

    fn push(out: &mut Vec<SchemaViolation>, path: &JsonPath, expected: impl Into<String>) {
        out.push(SchemaViolation {
            path: path.to_string(),
            expected: expected.into(),
        });
    }

    fn visit(&self, node: &SchemaNode, value: &Value, path: &JsonPath, out: &mut Vec<SchemaViolation>) {
        match node {
            SchemaNode::String { allowed, min_len } => {
                let Some(s) = value.as_str() else {
                    Self::push(out, path, format!("string, found {}", type_name(value)));
                    return;
                };
                if let Some(allowed) = allowed {
                    if !allowed.contains(&s) {
                        Self::push(out, path, format!("one of {}", quoted_list(allowed.iter().copied())));
                        return;
                    }
                }
                if s.trim().chars().count() < *min_len {
                    Self::push(out, path, "non-empty string");
                }
            }
            SchemaNode::Number { min, max } => {
                let Some(n) = value.as_f64() else {
                    Self::push(out, path, format!("number, found {}", type_name(value)));
                    return;
                };
                let below = min.map_or(false, |m| n < m);
                let above = max.map_or(false, |m| n > m);
                if below || above {
                    Self::push(out, path, range_text("number", *min, *max));
                }
            }
            SchemaNode::Integer { min, max } => {
                let n = match value {
                    Value::Number(num) if num.is_i64() || num.is_u64() => num.as_i64(),
                    _ => {
                        Self::push(out, path, format!("integer, found {}", type_name(value)));
                        return;
                    }
                };
                // u64 beyond i64::MAX only fails an upper bound
                let below = matches!((min, n), (Some(m), Some(v)) if v < *m);
                let above = match (max, n) {
                    (Some(m), Some(v)) => v > *m,
                    (Some(_), None) => true,
                    _ => false,
                };
                if below || above {
                    Self::push(
                        out,
                        path,
                        range_text("integer", min.map(|m| m as f64), max.map(|m| m as f64)),
                    );
                }
            }
            SchemaNode::Boolean => {
                if !value.is_boolean() {
                    Self::push(out, path, format!("boolean, found {}", type_name(value)));
                }
            }
            SchemaNode::Array {
                items,
                min_items,
                max_items,
            } => {
                let Some(elements) = value.as_array() else {
                    Self::push(out, path, format!("array, found {}", type_name(value)));
                    return;
                };
                if let Some(min) = min_items {
                    if elements.len() < *min {
                        Self::push(out, path, format!("at least {min} items, found {}", elements.len()));
                    }
                }
                if let Some(max) = max_items {
                    if elements.len() > *max {
                        Self::push(out, path, format!("at most {max} items, found {}", elements.len()));
                    }
                }
                for (i, element) in elements.iter().enumerate() {
                    self.visit(items, element, &path.index(i), out);
                }
            }
            SchemaNode::Object { fields } => self.visit_object(fields, value, path, out),
            SchemaNode::Block => self.visit_block(value, path, out),
        }
    }

    fn visit_object(&self, fields: &[Field], value: &Value, path: &JsonPath, out: &mut Vec<SchemaViolation>) {
        let Some(map) = value.as_object() else {
            Self::push(out, path, format!("object, found {}", type_name(value)));
            return;
        };
        for field in fields {
            let field_path = path.key(field.name);
            match map.get(field.name) {
                None => {
                    if !field.optional {
                        Self::push(out, &field_path, "required property");
                    }
                }
                Some(Value::Null) if field.optional => {}
                Some(inner) => self.visit(&field.node, inner, &field_path, out),
            }
        }
        for key in map.keys() {
            if !fields.iter().any(|f| f.name == key) {
                Self::push(out, &path.key(key), "no additional properties");
            }
        }
    }

    fn visit_block(&self, value: &Value, path: &JsonPath, out: &mut Vec<SchemaViolation>) {
        let Some(map) = value.as_object() else {
            Self::push(out, path, format!("block object, found {}", type_name(value)));
            return;
        };

        if let Some(id) = map.get("id") {
            if !id.is_string() && !id.is_null() {
                Self::push(out, &path.key("id"), format!("string, found {}", type_name(id)));
            }
        }

        let type_path = path.key("type");
        let kind = match map.get("type") {
            None => {
                Self::push(out, &type_path, "required property");
                None
            }
            Some(tag) => match tag.as_str().and_then(BlockKind::from_tag) {
                Some(kind) => Some(kind),
                None => {
                    Self::push(
                        out,
                        &type_path,
                        format!("one of {}", quoted_list(self.registry.kinds().map(|k| k.tag()))),
                    );
                    None
                }
            },
        };

        let data_path = path.key("data");
        match (kind, map.get("data")) {
            (_, None) => Self::push(out, &data_path, "required property"),
            (Some(kind), Some(data)) => {
                self.visit(self.registry.payload_node(kind), data, &data_path, out)
            }
            // unknown type: the payload has nothing to be checked against
            (None, Some(_)) => {}
        }

        for key in map.keys() {
            if !matches!(key.as_str(), "id" | "type" | "data") {
                Self::push(out, &path.key(key), "no additional properties");
            }
        }
    }
}

fn range_text(what: &str, min: Option<f64>, max: Option<f64>) -> String {
    match (min, max) {
        (Some(lo), Some(hi)) => format!("{what} in [{lo}, {hi}]"),
        (Some(lo), None) => format!("{what} >= {lo}"),
        (None, Some(hi)) => format!("{what} <= {hi}"),
        (None, None) => what.to_string(),
    }
}
