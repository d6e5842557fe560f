//! `{{name}}` placeholder resolution for data transform steps

use serde_json::{Map, Value};

/// Name inside a whole-string `{{ name }}` placeholder
pub fn placeholder_name(value: &str) -> Option<&str> {
    let inner = value
        .trim()
        .strip_prefix("{{")?
        .strip_suffix("}}")?
        .trim();

    if inner.is_empty() || inner.contains("{{") || inner.contains("}}") {
        None
    } else {
        Some(inner)
    }
}

/// Resolve every input entry against the context
///
/// Placeholders take the context value (null when absent); anything else is
/// copied unchanged.
pub fn resolve_templates(
    input: &Map<String, Value>,
    context: &Map<String, Value>,
) -> Map<String, Value> {
    input
        .iter()
        .map(|(key, value)| {
            let resolved = match value {
                Value::String(s) => match placeholder_name(s) {
                    Some(name) => context.get(name).cloned().unwrap_or(Value::Null),
                    None => value.clone(),
                },
                other => other.clone(),
            };
            (key.clone(), resolved)
        })
        .collect()
}
