// ABOUTME: Pure schema-optimization transform applied to tool descriptors before activation
// ABOUTME: Strips default/examples and truncates description strings across every schema node
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Schema Optimizer.
//!
//! A pure function over a [`crate::tools::ToolDescriptor`]: every
//! `description` string (on the tool itself, on the root input schema, and
//! recursively on every nested schema node) is truncated to at most 50 code
//! points, and the keys `default`/`examples` are stripped from every schema
//! node. Everything else — key order, array order, non-string descriptions —
//! is left untouched.

use serde_json::Value;

use crate::tools::ToolDescriptor;

/// Maximum description length, in Unicode code points, after optimization.
pub const MAX_DESCRIPTION_CODEPOINTS: usize = 50;

/// Truncate a string to at most `MAX_DESCRIPTION_CODEPOINTS` code points.
///
/// A plain slice with no ellipsis, operating on `char`s rather than bytes so
/// multi-byte UTF-8 sequences are never split.
fn truncate_description(s: &str) -> String {
    if s.chars().count() <= MAX_DESCRIPTION_CODEPOINTS {
        return s.to_owned();
    }
    s.chars().take(MAX_DESCRIPTION_CODEPOINTS).collect()
}

/// Recursively optimize a single JSON-Schema node in place.
///
/// Descends into every place a schema can nest another schema: `properties`
/// (map of schemas), `items` (schema or array of schemas), `additionalProperties`
/// (when itself an object, i.e. a schema rather than a bare bool),
/// `oneOf`/`anyOf`/`allOf` (arrays of schemas), and `definitions`/`$defs`
/// (maps of schemas).
pub fn optimize_schema(node: &mut Value) {
    let Value::Object(map) = node else {
        return;
    };

    map.remove("default");
    map.remove("examples");

    if let Some(Value::String(desc)) = map.get_mut("description") {
        *desc = truncate_description(desc);
    }

    if let Some(props) = map.get_mut("properties").and_then(Value::as_object_mut) {
        for (_, schema) in props.iter_mut() {
            optimize_schema(schema);
        }
    }

    if let Some(items) = map.get_mut("items") {
        match items {
            Value::Array(list) => {
                for item in list.iter_mut() {
                    optimize_schema(item);
                }
            }
            other => optimize_schema(other),
        }
    }

    if let Some(additional) = map.get_mut("additionalProperties") {
        if additional.is_object() {
            optimize_schema(additional);
        }
    }

    for key in ["oneOf", "anyOf", "allOf"] {
        if let Some(Value::Array(list)) = map.get_mut(key) {
            for item in list.iter_mut() {
                optimize_schema(item);
            }
        }
    }

    for key in ["definitions", "$defs"] {
        if let Some(defs) = map.get_mut(key).and_then(Value::as_object_mut) {
            for (_, schema) in defs.iter_mut() {
                optimize_schema(schema);
            }
        }
    }
}

/// Apply the Schema Optimizer to a tool descriptor, returning a new,
/// optimized descriptor. Pure: the input is not mutated.
#[must_use]
pub fn optimize(tool: &ToolDescriptor) -> ToolDescriptor {
    let mut optimized = tool.clone();
    optimized.description = truncate_description(&optimized.description);
    optimize_schema(&mut optimized.input_schema);
    optimized
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn long_desc(n: usize) -> String {
        "d".repeat(n)
    }

    #[test]
    fn s4_schema_optimizer_contract() {
        let tool = ToolDescriptor::new(
            "t/tool",
            long_desc(60),
            json!({
                "type": "object",
                "description": long_desc(60),
                "properties": {
                    "foo": {
                        "type": "string",
                        "default": "bar",
                        "examples": ["baz"],
                        "description": long_desc(60),
                    }
                }
            }),
        );

        let out = optimize(&tool);
        assert!(out.description.chars().count() <= 50);
        let root_desc = out.input_schema["description"].as_str().unwrap();
        assert!(root_desc.chars().count() <= 50);
        let foo = &out.input_schema["properties"]["foo"];
        assert!(foo.get("default").is_none());
        assert!(foo.get("examples").is_none());
        assert!(foo["description"].as_str().unwrap().chars().count() <= 50);
    }

    #[test]
    fn non_string_description_untouched() {
        let mut node = json!({"description": 42, "default": 1});
        optimize_schema(&mut node);
        assert_eq!(node["description"], json!(42));
        assert!(node.get("default").is_none());
    }

    #[test]
    fn recurses_into_defs_and_one_of() {
        let mut node = json!({
            "oneOf": [{"description": long_desc(55), "default": 1}],
            "$defs": {"X": {"description": long_desc(55), "examples": [1]}},
        });
        optimize_schema(&mut node);
        assert!(node["oneOf"][0]["default"].is_null());
        assert_eq!(node["oneOf"][0]["description"].as_str().unwrap().chars().count(), 50);
        assert!(node["$defs"]["X"].get("examples").is_none());
    }

    #[test]
    fn short_description_untruncated() {
        assert_eq!(truncate_description("short"), "short");
    }
}
