//! Foundation types for protolab.
//!
//! This crate provides the value, path, and reporting types shared by every
//! other protolab crate.
//!
//! # Key Types
//!
//! - [`JsonValue`] / [`Record`] -- Tagged JSON values and string-keyed records
//! - [`KeyPath`] -- Ordered key segments locating a position in a nested value
//! - [`MergeStrategy`] -- The merge variant under study
//! - [`Holder`] -- Which well-known shared record an attribute lives on
//! - [`ContaminationRecord`] -- One attacker-influenced attribute found on a holder

pub mod contamination;
pub mod json;
pub mod names;
pub mod path;
pub mod strategy;

pub use contamination::{ContaminationRecord, ContaminationSource, Holder};
pub use json::{kind_name, nesting_depth, JsonValue, Record};
pub use path::KeyPath;
pub use strategy::{MergeStrategy, ParseStrategyError};
