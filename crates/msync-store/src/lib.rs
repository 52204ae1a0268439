//! msync-store
//!
//! Dataset boundary for sync runs. This crate owns the reader/writer traits
//! the runtime is written against, plus two backends:
//!
//! - [`MemoryDataset`]: in-process tables, used by tests and embedders.
//! - [`CsvDataset`]: one CSV file per named dataset, rewritten atomically on
//!   every row update.
//!
//! No matching or validation logic lives here; see `msync-reconcile`.

mod csv_file;
mod memory;

pub use csv_file::CsvDataset;
pub use memory::MemoryDataset;

use std::fmt;

use msync_schemas::{DatasetRow, FieldUpdate, RowHandle};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors a dataset backend may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No dataset is registered under this name.
    UnknownDataset(String),
    /// The handle does not refer to a row in its dataset.
    UnknownRecord(RowHandle),
    /// The update names a field the dataset does not have.
    UnknownField { handle: RowHandle, field: String },
    /// Filesystem or transport failure.
    Io(String),
    /// Stored data could not be decoded.
    Decode(String),
    /// The backend refused the write for its own reasons.
    Rejected(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::UnknownDataset(name) => write!(f, "unknown dataset '{name}'"),
            StoreError::UnknownRecord(handle) => write!(f, "unknown record {handle}"),
            StoreError::UnknownField { handle, field } => {
                write!(f, "cannot update {handle}: unknown field '{field}'")
            }
            StoreError::Io(msg) => write!(f, "store io error: {msg}"),
            StoreError::Decode(msg) => write!(f, "store decode error: {msg}"),
            StoreError::Rejected(msg) => write!(f, "write rejected: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Read side of a dataset backend.
///
/// Object-safe so the runtime can take `&dyn DatasetReader`.
#[async_trait::async_trait]
pub trait DatasetReader: Send + Sync {
    /// Short backend identifier for logs (e.g. `"csv"`).
    fn backend_name(&self) -> &'static str;

    /// Every row of `dataset`, in stored order, each with a handle that the
    /// paired [`DatasetWriter`] accepts.
    async fn list_rows(&self, dataset: &str) -> Result<Vec<DatasetRow>, StoreError>;
}

/// Write side of a dataset backend.
#[async_trait::async_trait]
pub trait DatasetWriter: Send + Sync {
    /// Apply `update` to the single row `handle` refers to. Fields not named
    /// in `update` must be left as they are.
    async fn update_row(&self, handle: &RowHandle, update: &FieldUpdate) -> Result<(), StoreError>;
}
