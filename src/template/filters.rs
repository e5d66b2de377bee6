//! Template filters registered on every template set

use std::collections::HashMap;

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::Value;

const PRETTY_INDENT: &str = "    ";

/// `{{ value | json }}`, `{{ value | json(indent="pretty") }}` or any other
/// indent unit such as `json(indent="\t")`
///
/// The output is an ordinary string, so auto-escaping still applies; add
/// `| safe` when embedding it in a `<script>` block.
pub(crate) fn json(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let indent = match args.get("indent") {
        None => None,
        Some(Value::String(indent)) if indent.is_empty() => None,
        Some(Value::String(indent)) if indent.eq_ignore_ascii_case("pretty") => {
            Some(PRETTY_INDENT.to_string())
        }
        Some(Value::String(indent)) => Some(indent.clone()),
        Some(other) => {
            return Err(tera::Error::msg(format!(
                "filter `json` expects a string `indent`, got {other}"
            )))
        }
    };

    let encoded = match indent {
        None => serde_json::to_string(value),
        Some(indent) => {
            let mut buf = Vec::new();
            let mut serializer = Serializer::with_formatter(
                &mut buf,
                PrettyFormatter::with_indent(indent.as_bytes()),
            );
            value
                .serialize(&mut serializer)
                .map(|()| String::from_utf8_lossy(&buf).into_owned())
        }
    };

    encoded
        .map(Value::String)
        .map_err(|e| tera::Error::chain("filter `json` failed to encode its input", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(indent: Value) -> HashMap<String, Value> {
        HashMap::from([("indent".to_string(), indent)])
    }

    #[test]
    fn test_compact() {
        let out = json(&json!({"a": [1, 2]}), &HashMap::new()).unwrap();
        assert_eq!(out, json!("{\"a\":[1,2]}"));
    }

    #[test]
    fn test_pretty() {
        let out = json(&json!({"a": 1}), &args(json!("Pretty"))).unwrap();
        assert_eq!(out, json!("{\n    \"a\": 1\n}"));
    }

    #[test]
    fn test_custom_indent() {
        let out = json(&json!([true]), &args(json!("\t"))).unwrap();
        assert_eq!(out, json!("[\n\ttrue\n]"));
    }

    #[test]
    fn test_non_string_indent() {
        assert!(json(&json!(1), &args(json!(4))).is_err());
    }
}
