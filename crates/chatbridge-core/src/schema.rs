//! Schema translation from tool-provider JSON Schema to the LLM dialect
//!
//! Tool servers describe their parameters with full JSON Schema. Function-calling
//! LLM APIs accept a narrower subset: no `$schema` marker, no
//! `additionalProperties`, no `default`, and no unions. [`normalize`] rewrites a
//! schema into that subset.
//!
//! Unions (`anyOf` / `oneOf`) are collapsed by merging the **first** alternative
//! into the parent schema, its keys overriding the parent's. This loses the other
//! alternatives; it is a known limitation of targeting a dialect without unions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys removed at every schema level
const STRIPPED_KEYS: &[&str] = &["$schema", "additionalProperties", "default"];

/// Union keys, in the order they are collapsed
const UNION_KEYS: &[&str] = &["anyOf", "oneOf"];

/// Shape of a single schema object, as far as normalization cares
enum SchemaNode {
    /// `anyOf` / `oneOf` present; `base` is the schema with the union key removed
    Union {
        base: Map<String, Value>,
        alternatives: Vec<Value>,
    },
    Object(Map<String, Value>),
    Array(Map<String, Value>),
    Scalar(Map<String, Value>),
}

impl SchemaNode {
    fn classify(mut map: Map<String, Value>) -> Self {
        for key in UNION_KEYS {
            match map.remove(*key) {
                Some(Value::Array(alternatives)) => {
                    return Self::Union {
                        base: map,
                        alternatives,
                    };
                }
                // A malformed union is dropped like any other unsupported key
                Some(_) | None => {}
            }
        }

        match map.get("type").and_then(Value::as_str) {
            Some("object") => Self::Object(map),
            Some("array") => Self::Array(map),
            _ if map.contains_key("properties") => Self::Object(map),
            _ if map.contains_key("items") => Self::Array(map),
            _ => Self::Scalar(map),
        }
    }

    fn normalize(self) -> Map<String, Value> {
        match self {
            Self::Union {
                mut base,
                alternatives,
            } => {
                if let Some(Value::Object(first)) = alternatives.into_iter().next() {
                    base.extend(first);
                }
                // The merged schema may carry another union or nested schemas
                Self::classify(base).normalize()
            }
            Self::Object(mut map) => {
                strip_unsupported(&mut map);
                if let Some(Value::Object(properties)) = map.get_mut("properties") {
                    for value in properties.values_mut() {
                        *value = normalize(value);
                    }
                }
                map
            }
            Self::Array(mut map) => {
                strip_unsupported(&mut map);
                match map.get_mut("items") {
                    Some(Value::Array(items)) => {
                        for item in items.iter_mut() {
                            *item = normalize(item);
                        }
                    }
                    Some(items) => *items = normalize(items),
                    None => {}
                }
                map
            }
            Self::Scalar(mut map) => {
                strip_unsupported(&mut map);
                map
            }
        }
    }
}

fn strip_unsupported(map: &mut Map<String, Value>) {
    for key in STRIPPED_KEYS {
        map.remove(*key);
    }
}

/// Rewrite `schema` into the LLM function-calling dialect.
///
/// Non-object input (including `null`) is returned unchanged, so a missing
/// schema can be passed straight through. The function is pure and idempotent.
pub fn normalize(schema: &Value) -> Value {
    match schema {
        Value::Object(map) => Value::Object(SchemaNode::classify(map.clone()).normalize()),
        other => other.clone(),
    }
}

/// Parameter block of an LLM tool declaration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedToolSchema {
    pub properties: Map<String, Value>,
    pub required: Vec<String>,
}

impl NormalizedToolSchema {
    /// Normalize a tool input schema and keep its `properties` / `required`.
    ///
    /// Absent or malformed fields become an empty mapping / empty list.
    pub fn from_input_schema(schema: &Value) -> Self {
        let normalized = normalize(schema);

        let properties = normalized
            .get("properties")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let mut required: Vec<String> = Vec::new();
        if let Some(names) = normalized.get("required").and_then(Value::as_array) {
            for name in names.iter().filter_map(Value::as_str) {
                if !required.iter().any(|r| r == name) {
                    required.push(name.to_string());
                }
            }
        }

        Self {
            properties,
            required,
        }
    }

    /// Render as an object-typed JSON Schema
    pub fn to_parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": self.properties,
            "required": self.required,
        })
    }
}
