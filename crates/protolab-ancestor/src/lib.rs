//! Shared ancestor record for protolab.
//!
//! Runtimes with prototype-style attribute resolution consult one shared
//! record for every attribute an ordinary record does not own. This crate
//! models that record explicitly, as an injected handle rather than a
//! language global, so the merge engine, the oracle, and tests can all be
//! pointed at the same (or at isolated) instances.
//!
//! Two well-known records are modelled:
//!
//! - the **prototype record** -- the shared ancestor proper, and
//! - the **constructor record** -- reachable from any record through
//!   `constructor`, whose `prototype` attribute leads back to the ancestor.
//!
//! # Key Types
//!
//! - [`SharedAncestor`] -- Cloneable handle to the process-wide state
//! - [`AncestorWriter`] -- Exclusive access for the duration of one merge
//! - [`AncestorSnapshot`] -- Point-in-time copy of both holders
//! - [`FreshRecord`] -- An empty record, for observing inherited attributes
//! - [`Slot`] -- Outcome of resolving a key on a record

pub mod ancestor;
pub mod builtins;
pub mod error;
pub mod resolution;
pub mod writer;

pub use ancestor::{AncestorSnapshot, FreshRecord, SharedAncestor};
pub use error::{AncestorError, AncestorResult};
pub use resolution::{redirect, Owner, Slot};
pub use writer::AncestorWriter;
