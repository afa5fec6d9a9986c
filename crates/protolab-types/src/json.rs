//! JSON value aliases and structural helpers.

/// A tagged JSON value: null, bool, number, string, array, or object.
pub type JsonValue = serde_json::Value;

/// A string-keyed record (the `Object` variant's payload).
pub type Record = serde_json::Map<String, JsonValue>;

/// Human-readable name of a value's variant.
pub fn kind_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// Maximum container nesting of a value.
///
/// Scalars have depth 0, `{}` and `[]` have depth 1. Computed with an
/// explicit stack so arbitrarily deep values cannot overflow the call stack.
pub fn nesting_depth(value: &JsonValue) -> usize {
    let mut deepest = 0;
    let mut stack = vec![(value, 0usize)];

    while let Some((current, depth)) = stack.pop() {
        match current {
            JsonValue::Object(map) => {
                deepest = deepest.max(depth + 1);
                stack.extend(map.values().map(|v| (v, depth + 1)));
            }
            JsonValue::Array(items) => {
                deepest = deepest.max(depth + 1);
                stack.extend(items.iter().map(|v| (v, depth + 1)));
            }
            _ => deepest = deepest.max(depth),
        }
    }

    deepest
}
