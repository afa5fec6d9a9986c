//! Recursive merge engine for protolab.
//!
//! Implements the naive deep-merge algorithms used by popular object
//! utilities, against an explicit [`SharedAncestor`]. The traversal treats
//! every key as an ordinary string: when a key such as `constructor` or
//! `__proto__` resolves to one of the shared holders and the source holds a
//! record there, the engine descends into the holder just as it would into
//! any nested record. That descent is the vulnerability; installing a
//! [`SegmentPolicy`] is the fix.
//!
//! # Quick Start
//!
//! ```rust
//! use protolab_ancestor::SharedAncestor;
//! use protolab_guard::KeyPathGuard;
//! use protolab_merge::{DeepMergeEngine, MergeConfig};
//! use serde_json::json;
//!
//! let ancestor = SharedAncestor::new();
//! let engine = DeepMergeEngine::new(ancestor.clone(), MergeConfig::default());
//! let payload = json!({"constructor": {"prototype": {"isAdmin": true}}});
//!
//! let guard = KeyPathGuard::default();
//! engine.defaults_deep(json!({}), &payload, Some(&guard)).unwrap();
//! assert_eq!(ancestor.fresh_record().get("isAdmin").unwrap(), None);
//!
//! engine.defaults_deep(json!({}), &payload, None).unwrap();
//! assert_eq!(ancestor.fresh_record().get("isAdmin").unwrap(), Some(json!(true)));
//! ```
//!
//! [`SharedAncestor`]: protolab_ancestor::SharedAncestor
//! [`SegmentPolicy`]: protolab_guard::SegmentPolicy

pub mod config;
pub mod customizer;
pub mod engine;
pub mod error;

pub use config::{MergeConfig, DEFAULT_MAX_DEPTH};
pub use customizer::{ConcatArrays, MergeCustomizer};
pub use engine::{DeepMergeEngine, MergeTarget};
pub use error::{MergeError, MergeResult};
