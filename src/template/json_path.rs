use serde_json::Value;
use tracing::debug;

/// Resolve a dotted path (`a.b.2.c`) against a JSON document.
///
/// Object nodes are indexed by key, array nodes by non-negative integer.
/// Anything unresolvable yields an empty string. Floats render with two
/// fractional digits; integers, strings and booleans render as-is.
pub fn extract(doc: &Value, path: &str) -> String {
    let mut current = doc;

    for segment in path.split('.').filter(|s| !s.is_empty()) {
        current = match current {
            Value::Object(map) => match map.get(segment) {
                Some(v) => v,
                None => return String::new(),
            },
            Value::Array(items) => match segment.parse::<usize>().ok().and_then(|i| items.get(i)) {
                Some(v) => v,
                None => return String::new(),
            },
            _ => {
                debug!(segment = %segment, path = %path, "invalid path segment");
                return String::new();
            }
        };
    }

    format_leaf(current)
}

fn format_leaf(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) if n.is_i64() || n.is_u64() => n.to_string(),
        Value::Number(n) => format!("{:.2}", n.as_f64().unwrap_or(0.0)),
        other => other.to_string(),
    }
}
