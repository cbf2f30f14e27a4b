// ABOUTME: JSON-Schema input validation applied before dispatch to a backend
// ABOUTME: Only a documented subset of JSON-Schema: type/properties/required/additionalProperties
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use serde_json::Value;

use crate::errors::GateError;

fn primitive_type_matches(declared: &str, value: &Value) -> bool {
    match declared {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

/// Validate `input` against `schema` per the rules a tool's `inputSchema`
/// must enforce before dispatch.
///
/// # Errors
/// - [`GateError::NotAnObject`] if the schema declares `type: "object"` and
///   `input` is not a (non-array) JSON object.
/// - [`GateError::UnknownProperty`] if a property not listed in
///   `schema.properties` is supplied and `additionalProperties` is not
///   explicitly `true`.
/// - [`GateError::MissingRequired`] if a property listed in `required` is
///   absent.
/// - [`GateError::TypeMismatch`] if a present property's declared primitive
///   type does not match the supplied value.
pub fn validate_input(schema: &Value, input: &Value) -> Result<(), GateError> {
    let declared_type = schema.get("type").and_then(Value::as_str);

    if declared_type == Some("object") {
        let Some(object) = input.as_object() else {
            return Err(GateError::NotAnObject);
        };

        let properties = schema.get("properties").and_then(Value::as_object);
        let allows_additional = schema
            .get("additionalProperties")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        if !allows_additional {
            if let Some(properties) = properties {
                for key in object.keys() {
                    if !properties.contains_key(key) {
                        return Err(GateError::UnknownProperty(key.clone()));
                    }
                }
            } else {
                for key in object.keys() {
                    return Err(GateError::UnknownProperty(key.clone()));
                }
            }
        }

        if let Some(required) = schema.get("required").and_then(Value::as_array) {
            for name in required {
                let Some(name) = name.as_str() else { continue };
                if !object.contains_key(name) {
                    return Err(GateError::MissingRequired(name.to_owned()));
                }
            }
        }

        if let Some(properties) = properties {
            for (name, prop_schema) in properties {
                let Some(value) = object.get(name) else { continue };
                let Some(declared) = prop_schema.get("type").and_then(Value::as_str) else {
                    continue;
                };
                if !primitive_type_matches(declared, value) {
                    return Err(GateError::TypeMismatch {
                        property: name.clone(),
                        expected: declared.to_owned(),
                    });
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object_schema() -> Value {
        json!({
            "type": "object",
            "properties": { "a": { "type": "string" } },
            "required": ["a"],
        })
    }

    #[test]
    fn s8_unknown_property_rejection() {
        let err = validate_input(&object_schema(), &json!({"a": "x", "b": 1})).unwrap_err();
        assert!(matches!(err, GateError::UnknownProperty(ref p) if p == "b"));
    }

    #[test]
    fn missing_required_is_rejected() {
        let err = validate_input(&object_schema(), &json!({})).unwrap_err();
        assert!(matches!(err, GateError::MissingRequired(ref p) if p == "a"));
    }

    #[test]
    fn non_object_input_rejected_for_object_schema() {
        let err = validate_input(&object_schema(), &json!([1, 2])).unwrap_err();
        assert!(matches!(err, GateError::NotAnObject));
    }

    #[test]
    fn type_mismatch_is_rejected() {
        let err = validate_input(&object_schema(), &json!({"a": 5})).unwrap_err();
        assert!(matches!(err, GateError::TypeMismatch { ref property, .. } if property == "a"));
    }

    #[test]
    fn additional_properties_true_allows_extras() {
        let schema = json!({
            "type": "object",
            "properties": { "a": { "type": "string" } },
            "additionalProperties": true,
        });
        assert!(validate_input(&schema, &json!({"a": "x", "b": 1})).is_ok());
    }

    #[test]
    fn non_object_schema_is_unchecked() {
        assert!(validate_input(&json!({"type": "string"}), &json!(42)).is_ok());
    }
}
