//! Contamination oracle for protolab.
//!
//! Captures a baseline of the shared ancestor, reports every attribute that
//! was added or changed since, restores the baseline, and probes whether a
//! fresh record now exposes attacker-chosen attributes.
//!
//! # Key Types
//!
//! - [`ContaminationOracle`] -- baseline / diff / reset / probe
//! - [`HolderDiff`] / [`HolderChange`] -- Per-holder attribute diff
//! - [`ProbeReport`] -- Watched attributes a fresh record exposes
//! - [`OracleConfig`] -- Watched attribute names

pub mod config;
pub mod error;
pub mod holder_diff;
pub mod oracle;

pub use config::{OracleConfig, DEFAULT_WATCHED};
pub use error::{OracleError, OracleResult};
pub use holder_diff::{diff_records, diff_snapshots, HolderChange, HolderDiff};
pub use oracle::{ContaminationOracle, ProbeReport};
