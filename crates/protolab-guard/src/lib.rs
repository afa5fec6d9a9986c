//! Key path guard for protolab.
//!
//! A recursive merge that follows certain key names (the ancestor-chain
//! accessor, `constructor`, and `prototype`) ends up writing onto the shared
//! ancestor record instead of the intended target. The guard is the policy
//! component that recognises those segments so the merge engine can drop
//! them. The policy is pluggable: running a payload once with no
//! policy and once with the default policy is how the harness compares the
//! vulnerable and patched behaviour.
//!
//! # Quick Start
//!
//! ```rust
//! use protolab_guard::{KeyPathGuard, SegmentPolicy};
//!
//! let guard = KeyPathGuard::default();
//! assert!(guard.is_dangerous("constructor", 0));
//! assert!(guard.is_dangerous("prototype", 3));
//! assert!(!guard.is_dangerous("isAdmin", 0));
//! ```

pub mod config;
pub mod guard;
pub mod policy;
pub mod segments;

pub use config::GuardConfig;
pub use guard::{GuardScope, KeyPathGuard};
pub use policy::SegmentPolicy;
pub use segments::{DangerousSegmentSet, CONSTRUCTOR, PROTOTYPE, PROTO_ACCESSOR};
