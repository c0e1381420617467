use serde_json::{Map, Value};

/// Converts a JSON Schema object into Gemini's `responseSchema` dialect:
/// upper-case type names, and none of the keywords Gemini rejects.
pub fn to_gemini_schema(schema: &Value) -> Value {
    match schema {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, value) in map {
                let converted = match key.as_str() {
                    "type" => match value.as_str() {
                        Some(name) => Value::String(name.to_uppercase()),
                        None => value.clone(),
                    },
                    "$schema" | "additionalProperties" | "title" => continue,
                    // Property names are user data, not schema keywords.
                    "properties" => match value {
                        Value::Object(props) => Value::Object(
                            props
                                .iter()
                                .map(|(name, prop)| (name.clone(), to_gemini_schema(prop)))
                                .collect(),
                        ),
                        other => other.clone(),
                    },
                    _ => to_gemini_schema(value),
                };
                out.insert(key.clone(), converted);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(to_gemini_schema).collect()),
        other => other.clone(),
    }
}
