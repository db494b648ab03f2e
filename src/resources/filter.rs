//! Field projection of resource content.

use serde_json::{Map, Value};

fn is_root(pointer: &str) -> bool {
    pointer.is_empty() || pointer == "/"
}

fn last_token(pointer: &str) -> &str {
    pointer.rsplit('/').next().unwrap_or(pointer)
}

fn unescape(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

/// Keep only the fields named by JSON pointers.
///
/// Each selected value lands under the pointer's last token, so `/a/b`
/// becomes a top-level `b`. An empty selection, a root pointer or `null`
/// content leaves the content alone. Pointers that resolve to nothing are
/// skipped.
pub fn filter_resource(content: &Value, fields: &[String]) -> Value {
    if content.is_null() || fields.is_empty() || fields.iter().any(|f| is_root(f)) {
        return content.clone();
    }

    let mut filtered = Map::new();
    for field in fields {
        let pointer = if field.starts_with('/') {
            field.clone()
        } else {
            format!("/{}", field)
        };
        if let Some(value) = content.pointer(&pointer) {
            filtered.insert(unescape(last_token(&pointer)), value.clone());
        }
    }
    Value::Object(filtered)
}
