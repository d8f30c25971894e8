// Shared prompt fragments and response-schema builders.
// Feature prompts live in generation/prompts.rs; this file holds only what
// several callers need.

use serde_json::{json, Map, Value};

/// Appended to prompts whose reply is parsed as JSON.
pub const JSON_ONLY_INSTRUCTION: &str = "Respond with valid JSON only. \
    Do NOT include any text outside the JSON value.";

/// Schema for a string field (Gemini OpenAPI subset).
pub fn string() -> Value {
    json!({ "type": "STRING" })
}

pub fn boolean() -> Value {
    json!({ "type": "BOOLEAN" })
}

pub fn array(items: Value) -> Value {
    json!({ "type": "ARRAY", "items": items })
}

/// Object schema; `required` names must appear in `properties`.
pub fn object(properties: &[(&str, Value)], required: &[&str]) -> Value {
    let properties: Map<String, Value> = properties
        .iter()
        .map(|(name, schema)| (name.to_string(), schema.clone()))
        .collect();
    let mut schema = json!({ "type": "OBJECT", "properties": properties });
    if !required.is_empty() {
        schema["required"] = json!(required);
    }
    schema
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_schema_shape() {
        let schema = object(&[("title", string()), ("tags", array(string()))], &["title"]);
        assert_eq!(
            schema,
            json!({
                "type": "OBJECT",
                "properties": {
                    "title": {"type": "STRING"},
                    "tags": {"type": "ARRAY", "items": {"type": "STRING"}}
                },
                "required": ["title"]
            })
        );
    }

    #[test]
    fn test_required_omitted_when_empty() {
        let schema = object(&[("ok", boolean())], &[]);
        assert!(schema.get("required").is_none());
    }
}
