//! Baseline attributes present on the holders at process start.

use protolab_types::{JsonValue, Record};

/// Methods every record inherits from the shared ancestor.
pub const PROTOTYPE_METHODS: [&str; 6] = [
    "hasOwnProperty",
    "isPrototypeOf",
    "propertyIsEnumerable",
    "toLocaleString",
    "toString",
    "valueOf",
];

/// Static methods on the constructor record.
pub const CONSTRUCTOR_METHODS: [&str; 4] = ["assign", "create", "freeze", "keys"];

fn native(name: &str) -> JsonValue {
    JsonValue::String(format!("function {name}() {{ [native code] }}"))
}

/// Baseline content of the prototype record.
pub fn prototype_record() -> Record {
    PROTOTYPE_METHODS
        .iter()
        .map(|name| (name.to_string(), native(name)))
        .collect()
}

/// Baseline content of the constructor record.
pub fn constructor_record() -> Record {
    let mut record: Record = CONSTRUCTOR_METHODS
        .iter()
        .map(|name| (name.to_string(), native(name)))
        .collect();
    record.insert("name".into(), JsonValue::String("Object".into()));
    record.insert("length".into(), JsonValue::from(1));
    record
}
