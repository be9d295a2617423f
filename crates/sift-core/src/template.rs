//! `$(key)` placeholder substitution for seeds and output templates.
//!
//! This is plain literal replacement, one pass per context entry in context
//! order. There is no escaping and no expression syntax; placeholders naming
//! keys that are not in the context pass through unchanged.

use crate::types::ExecutionContext;

/// Replace every `$(key)` in `template` with the matching context value.
pub fn render(template: &str, context: &ExecutionContext) -> String {
    let mut rendered = template.to_string();
    for (key, value) in context {
        let placeholder = format!("$({})", key);
        if rendered.contains(&placeholder) {
            rendered = rendered.replace(&placeholder, value);
        }
    }
    rendered
}

/// List the keys referenced by `$(key)` placeholders, in order of appearance.
pub fn placeholders(template: &str) -> Vec<String> {
    let mut keys = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find("$(") {
        let after = &rest[start + 2..];
        match after.find(')') {
            Some(end) => {
                let key = &after[..end];
                if !key.is_empty() && !keys.iter().any(|k| k == key) {
                    keys.push(key.to_string());
                }
                rest = &after[end + 1..];
            }
            None => break,
        }
    }
    keys
}

/// Placeholders in `template` that the context cannot resolve.
pub fn unresolved(template: &str, context: &ExecutionContext) -> Vec<String> {
    placeholders(template)
        .into_iter()
        .filter(|key| !context.contains_key(key))
        .collect()
}
