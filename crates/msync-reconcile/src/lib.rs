//! msync-reconcile
//!
//! Validation and matching core for manifest sync runs.
//!
//! - Batch-level gates run once, before any row is resolved: duplicate
//!   (trimmed) batch keys and missing batch keys abort the run.
//! - Every batch row must resolve to exactly one manifest row; zero or
//!   several matches abort the run.
//! - A resolved row yields a [`MergeInstruction`] carrying only the
//!   whitelisted destination fields.
//!
//! Deterministic, pure logic. No IO. Reading and writing datasets is the
//! caller's job.

mod engine;
mod error;
mod state;
mod types;
mod validator;

pub use engine::{build_update, ManifestIndex, Reconciler, Resolution};
pub use error::{DuplicateContext, ReconcileError, ReconcileErrorKind};
pub use state::{IllegalTransition, RunState};
pub use types::*;
pub use validator::{validate_batch, BatchEntry, ValidatedBatch, ValidationOptions};
