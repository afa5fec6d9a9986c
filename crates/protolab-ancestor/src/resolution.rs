//! Attribute resolution rules.
//!
//! Resolving key `k` on an ordinary record checks, in order: the record's
//! own attributes, the accessor redirects, attributes inherited from the
//! prototype record. The holders themselves inherit nothing that is
//! modelled, so only own attributes and redirects apply to them.

use protolab_types::names::{CONSTRUCTOR, PROTOTYPE, PROTO_ACCESSOR};
use protolab_types::{Holder, JsonValue};

/// The record on which a key is being resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Owner {
    /// Any record that is not one of the holders.
    Ordinary,
    /// One of the well-known shared records.
    Shared(Holder),
}

/// Outcome of resolving one key.
#[derive(Clone, Debug, PartialEq)]
pub enum Slot {
    /// The record owns the attribute.
    Own,
    /// The key is an accessor leading to a holder.
    Redirect(Holder),
    /// Not owned; inherited from the prototype record with this value.
    Inherited(JsonValue),
    /// Not reachable at all.
    Absent,
}

impl Slot {
    /// Returns `true` if a lookup through this slot yields a value.
    pub fn is_present(&self) -> bool {
        !matches!(self, Self::Absent)
    }
}

/// The holder `key` leads to when looked up on `owner`, if it is an accessor.
pub fn redirect(owner: Owner, key: &str) -> Option<Holder> {
    match (owner, key) {
        (Owner::Ordinary, PROTO_ACCESSOR) => Some(Holder::Prototype),
        (Owner::Ordinary, CONSTRUCTOR) => Some(Holder::Constructor),
        (Owner::Shared(Holder::Prototype), CONSTRUCTOR) => Some(Holder::Constructor),
        (Owner::Shared(Holder::Constructor), PROTOTYPE) => Some(Holder::Prototype),
        _ => None,
    }
}
