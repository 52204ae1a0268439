//! Test support for sync runs: row fixtures in the default manifest layout,
//! CSV file helpers, and a writer that records and fails on demand.

mod faulty_writer;

pub use faulty_writer::FaultyWriter;

use anyhow::{Context, Result};
use msync_config::{DEFAULT_BATCH_DATASET, DEFAULT_MANIFEST_DATASET};
use msync_schemas::{DatasetRow, FieldValue, RowHandle};
use msync_store::MemoryDataset;
use serde_json::Value;
use std::path::Path;

pub const MANIFEST: &str = DEFAULT_MANIFEST_DATASET;
pub const BATCH: &str = DEFAULT_BATCH_DATASET;

/// Manifest header row for CSV fixtures. Destination columns come first,
/// followed by columns no run may touch.
pub const MANIFEST_HEADERS: &[&str] = &[
    "Sample ID",
    "KCCG FluidX tube ID",
    "Concentration (ng/ul)*",
    "Volume (ul)*",
    "ng available",
    "comments",
    "Project",
    "Received",
];

/// Batch header row for CSV fixtures. Two of the source headers carry a
/// trailing space.
pub const BATCH_HEADERS: &[&str] = &[
    "Sample ID1",
    "KCCG FluidX tube ID1",
    "FD tube conc after robot dilution IQC (ng/ul) ",
    "Vol left in FD tube after 80ul transfer to DNA plate (ul) ",
    "ng available1",
    "comment",
    "Plate well",
];

/// A manifest row with the key set and untouchable columns filled in.
pub fn manifest_row(record_id: &str, sample_id: &str) -> DatasetRow {
    DatasetRow::new(RowHandle::new(MANIFEST, record_id))
        .with_field("Sample ID", sample_id)
        .with_field("Project", "KCCG-WGS")
        .with_field("Received", "2024-03-11")
}

/// A batch row whose source values are derived from `n`, so tests can tell
/// rows apart after a merge.
pub fn batch_row(n: usize, sample_id: impl Into<FieldValue>) -> DatasetRow {
    DatasetRow::new(RowHandle::new(BATCH, format!("row-{n}")))
        .with_field("Sample ID1", sample_id)
        .with_field("KCCG FluidX tube ID1", format!("FX{n:06}"))
        .with_field("FD tube conc after robot dilution IQC (ng/ul) ", format!("{}.5", 10 + n))
        .with_field("Vol left in FD tube after 80ul transfer to DNA plate (ul) ", format!("{}", 20 + n))
        .with_field("ng available1", format!("{}", 100 * n))
        .with_field("comment", format!("batch note {n}"))
        .with_field("Plate well", format!("A{n:02}"))
}

/// Manifest rows `rec1..recN`, one per key.
pub fn manifest(keys: &[&str]) -> Vec<DatasetRow> {
    keys.iter()
        .enumerate()
        .map(|(i, k)| manifest_row(&format!("rec{}", i + 1), k))
        .collect()
}

/// Batch rows numbered from 1, one per key. `Value::Null` gives a row with
/// no key.
pub fn batch(keys: &[Value]) -> Vec<DatasetRow> {
    keys.iter()
        .enumerate()
        .map(|(i, k)| batch_row(i + 1, k.clone()))
        .collect()
}

/// In-memory store holding both default datasets.
pub fn memory_store(manifest: Vec<DatasetRow>, batch: Vec<DatasetRow>) -> MemoryDataset {
    MemoryDataset::new()
        .with_dataset(MANIFEST, manifest)
        .with_dataset(BATCH, batch)
}

pub fn write_csv(path: &Path, headers: &[&str], rows: &[Vec<&str>]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("create csv: {}", path.display()))?;
    wtr.write_record(headers)?;
    for row in rows {
        wtr.write_record(row)?;
    }
    wtr.flush().context("flush csv")?;
    Ok(())
}

/// Header and data records of a CSV file, cells verbatim.
pub fn read_csv(path: &Path) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("open csv: {}", path.display()))?;
    let headers = rdr.headers()?.iter().map(str::to_string).collect();
    let mut records = Vec::new();
    for rec in rdr.records() {
        records.push(rec?.iter().map(str::to_string).collect());
    }
    Ok((headers, records))
}
