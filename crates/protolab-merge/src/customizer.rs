use protolab_types::JsonValue;

/// Per-key hook consulted by `merge_with` before the default rule.
///
/// Receives the value the target currently resolves to at `key` (`None` when
/// absent), the source value, and the key. Returning `Some` assigns that
/// value verbatim and stops descent at this key; returning `None` means "no
/// opinion" and the plain merge rule applies.
pub trait MergeCustomizer: Send + Sync {
    fn customize(
        &self,
        target: Option<&JsonValue>,
        source: &JsonValue,
        key: &str,
    ) -> Option<JsonValue>;
}

impl<F> MergeCustomizer for F
where
    F: Fn(Option<&JsonValue>, &JsonValue, &str) -> Option<JsonValue> + Send + Sync,
{
    fn customize(
        &self,
        target: Option<&JsonValue>,
        source: &JsonValue,
        key: &str,
    ) -> Option<JsonValue> {
        self(target, source, key)
    }
}

/// Concatenate onto arrays already present in the target.
///
/// A non-array source value is appended as a single element. Any other
/// target shape gets no opinion.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConcatArrays;

impl MergeCustomizer for ConcatArrays {
    fn customize(
        &self,
        target: Option<&JsonValue>,
        source: &JsonValue,
        _key: &str,
    ) -> Option<JsonValue> {
        let Some(JsonValue::Array(existing)) = target else {
            return None;
        };
        let mut combined = existing.clone();
        match source {
            JsonValue::Array(more) => combined.extend(more.iter().cloned()),
            other => combined.push(other.clone()),
        }
        Some(JsonValue::Array(combined))
    }
}
