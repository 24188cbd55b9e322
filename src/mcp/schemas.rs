//! JSON schema builders for MCP tools.

use crate::inference::MAX_GENERATION_LENGTH;
use serde_json::{Map, Value};

/// Build the schema describing the `summarize` tool input.
pub(crate) fn summarize_input_schema() -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert(
        "text".into(),
        string_schema("Document text to summarize (for example the text layer of a contract)"),
    );
    properties.insert(
        "max_length".into(),
        length_schema("Upper bound on each chunk summary length"),
    );
    properties.insert(
        "min_length".into(),
        length_schema("Lower bound on each chunk summary length; must not exceed max_length"),
    );

    finalize_object_schema(properties, &["text"])
}

/// Schema for tools that take no arguments.
pub(crate) fn empty_object_schema() -> Map<String, Value> {
    finalize_object_schema(Map::new(), &[])
}

fn string_schema(description: &str) -> Value {
    let mut schema = Map::new();
    schema.insert("type".into(), Value::String("string".into()));
    schema.insert("description".into(), Value::String(description.into()));
    Value::Object(schema)
}

fn length_schema(description: &str) -> Value {
    let mut schema = Map::new();
    schema.insert("type".into(), Value::String("integer".into()));
    schema.insert("description".into(), Value::String(description.into()));
    schema.insert("minimum".into(), Value::Number(1.into()));
    schema.insert(
        "maximum".into(),
        Value::Number(MAX_GENERATION_LENGTH.into()),
    );
    Value::Object(schema)
}

fn finalize_object_schema(properties: Map<String, Value>, required: &[&str]) -> Map<String, Value> {
    let mut schema = Map::new();
    schema.insert("type".into(), Value::String("object".into()));
    schema.insert("properties".into(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert(
            "required".into(),
            Value::Array(
                required
                    .iter()
                    .map(|&key| Value::String(key.into()))
                    .collect(),
            ),
        );
    }
    schema.insert("additionalProperties".into(), Value::Bool(false));
    schema
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summarize_schema_requires_text() {
        let schema = summarize_input_schema();
        assert_eq!(schema["required"], serde_json::json!(["text"]));
        assert_eq!(schema["properties"]["max_length"]["minimum"], 1);
        assert_eq!(
            schema["properties"]["max_length"]["maximum"],
            MAX_GENERATION_LENGTH as u64
        );
        assert_eq!(schema["additionalProperties"], false);
    }

    #[test]
    fn empty_schema_has_no_required_fields() {
        let schema = empty_object_schema();
        assert!(!schema.contains_key("required"));
        assert_eq!(schema["properties"], serde_json::json!({}));
    }
}
