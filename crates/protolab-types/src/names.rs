//! Attribute names with special meaning in the attribute-resolution model.

/// The ancestor-chain accessor: resolves to the shared ancestor itself.
pub const PROTO_ACCESSOR: &str = "__proto__";
/// Resolves to the constructor record from any ordinary record.
pub const CONSTRUCTOR: &str = "constructor";
/// The constructor attribute that points at the shared ancestor.
pub const PROTOTYPE: &str = "prototype";
