/// A pluggable predicate deciding whether a key segment must not be
/// followed during a recursive merge.
///
/// `depth` is the recursion depth of the record that owns the segment: keys
/// of the top-level source record are at depth 0.
///
/// The trait is object-safe and `Send + Sync` so policies can be shared as
/// `Arc<dyn SegmentPolicy>` between the harness and request handlers.
pub trait SegmentPolicy: Send + Sync {
    /// Short name used in logs and reports.
    fn name(&self) -> &str;

    /// Returns `true` if the merge must drop `segment` at `depth`.
    fn is_dangerous(&self, segment: &str, depth: usize) -> bool;
}

impl<F> SegmentPolicy for F
where
    F: Fn(&str, usize) -> bool + Send + Sync,
{
    fn name(&self) -> &str {
        "custom"
    }

    fn is_dangerous(&self, segment: &str, depth: usize) -> bool {
        self(segment, depth)
    }
}
