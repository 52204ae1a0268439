//! msync-runtime
//!
//! Run orchestration. A [`SyncRunner`] reads the manifest and the batch
//! concurrently, passes the batch through the validation gates, then
//! resolves and writes one row at a time, awaiting each write before the
//! next row. Any failure aborts the run as a [`RunAbort`]; there is no
//! rollback of rows already written.

mod error;
mod runner;

pub use error::{RunAbort, RunError};
pub use runner::{MergedRow, RunPlan, RunReport, SyncRunner};
