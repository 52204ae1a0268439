//! CSV-file dataset backend.
//!
//! ## File contract
//!
//! - First record is the header. Column names are taken verbatim, including
//!   leading/trailing whitespace; duplicate column names are rejected.
//! - A UTF-8 BOM at the start of the file is ignored.
//! - Empty cells read as null; every other cell reads as a string. Numbers
//!   are not inferred, so values move through a merge unchanged.
//! - Record ids are `row-<n>`, `n` being the 1-based data row.
//!
//! Every [`DatasetWriter::update_row`] call rewrites the whole file through a
//! temp file in the same directory followed by a rename, so the file on disk
//! always reflects a whole number of completed row updates.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use msync_schemas::{DatasetRow, FieldUpdate, FieldValue, RowHandle};
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::{DatasetReader, DatasetWriter, StoreError};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

#[derive(Debug, Clone)]
struct CsvTable {
    headers: Vec<String>,
    records: Vec<Vec<String>>,
}

impl CsvTable {
    fn to_rows(&self, dataset: &str) -> Vec<DatasetRow> {
        self.records
            .iter()
            .enumerate()
            .map(|(i, rec)| {
                let fields: BTreeMap<String, FieldValue> = self
                    .headers
                    .iter()
                    .enumerate()
                    .map(|(c, h)| (h.clone(), cell_to_value(rec.get(c).map(String::as_str))))
                    .collect();
                DatasetRow {
                    handle: RowHandle::new(dataset, record_id(i)),
                    fields,
                }
            })
            .collect()
    }
}

/// Named datasets backed by CSV files.
#[derive(Debug, Default)]
pub struct CsvDataset {
    paths: HashMap<String, PathBuf>,
    tables: Mutex<HashMap<String, CsvTable>>,
}

impl CsvDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `path` as the backing file for `dataset`.
    pub fn with_file(mut self, dataset: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.paths.insert(dataset.into(), path.into());
        self
    }

    pub fn path_of(&self, dataset: &str) -> Option<&Path> {
        self.paths.get(dataset).map(PathBuf::as_path)
    }

    fn path_for(&self, dataset: &str) -> Result<&Path, StoreError> {
        self.path_of(dataset)
            .ok_or_else(|| StoreError::UnknownDataset(dataset.to_string()))
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, CsvTable>>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Io("csv dataset lock poisoned".to_string()))
    }
}

#[async_trait::async_trait]
impl DatasetReader for CsvDataset {
    fn backend_name(&self) -> &'static str {
        "csv"
    }

    async fn list_rows(&self, dataset: &str) -> Result<Vec<DatasetRow>, StoreError> {
        let path = self.path_for(dataset)?;
        let table = read_table(path)?;
        debug!(
            dataset,
            path = %path.display(),
            rows = table.records.len(),
            "csv dataset loaded"
        );
        let rows = table.to_rows(dataset);
        self.lock()?.insert(dataset.to_string(), table);
        Ok(rows)
    }
}

#[async_trait::async_trait]
impl DatasetWriter for CsvDataset {
    async fn update_row(&self, handle: &RowHandle, update: &FieldUpdate) -> Result<(), StoreError> {
        let path = self.path_for(handle.dataset())?;
        let mut tables = self.lock()?;

        if !tables.contains_key(handle.dataset()) {
            let table = read_table(path)?;
            tables.insert(handle.dataset().to_string(), table);
        }
        let table = tables
            .get_mut(handle.dataset())
            .ok_or_else(|| StoreError::UnknownDataset(handle.dataset().to_string()))?;

        let idx = parse_record_id(handle.record_id())
            .filter(|i| *i < table.records.len())
            .ok_or_else(|| StoreError::UnknownRecord(handle.clone()))?;

        // Resolve every column before touching the record so a bad field
        // leaves the row untouched.
        let mut cols: Vec<(usize, String)> = Vec::with_capacity(update.len());
        for a in &update.assignments {
            let col = table
                .headers
                .iter()
                .position(|h| h == &a.field)
                .ok_or_else(|| StoreError::UnknownField {
                    handle: handle.clone(),
                    field: a.field.clone(),
                })?;
            cols.push((col, value_to_cell(&a.value)));
        }

        let mut next = table.clone();
        let record = &mut next.records[idx];
        record.resize(next.headers.len(), String::new());
        for (col, cell) in cols {
            record[col] = cell;
        }

        write_table_atomic(path, &next)?;
        *table = next;
        Ok(())
    }
}

fn record_id(index: usize) -> String {
    format!("row-{}", index + 1)
}

fn parse_record_id(id: &str) -> Option<usize> {
    id.strip_prefix("row-")?
        .parse::<usize>()
        .ok()
        .filter(|n| *n >= 1)
        .map(|n| n - 1)
}

fn cell_to_value(cell: Option<&str>) -> FieldValue {
    match cell {
        None | Some("") => Value::Null,
        Some(s) => Value::String(s.to_string()),
    }
}

fn value_to_cell(v: &FieldValue) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn read_table(path: &Path) -> Result<CsvTable, StoreError> {
    let bytes = std::fs::read(path)
        .map_err(|e| StoreError::Io(format!("read '{}': {e}", path.display())))?;
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);

    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| StoreError::Decode(format!("'{}' header: {e}", path.display())))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut seen: HashSet<&str> = HashSet::with_capacity(headers.len());
    for h in &headers {
        if !seen.insert(h.as_str()) {
            return Err(StoreError::Decode(format!(
                "'{}' has duplicate column '{h}'",
                path.display()
            )));
        }
    }

    let mut records = Vec::new();
    for (i, rec) in rdr.records().enumerate() {
        let rec = rec.map_err(|e| {
            StoreError::Decode(format!("'{}' data row {}: {e}", path.display(), i + 1))
        })?;
        if rec.len() > headers.len() {
            return Err(StoreError::Decode(format!(
                "'{}' data row {} has {} cells but the header has {}",
                path.display(),
                i + 1,
                rec.len(),
                headers.len()
            )));
        }
        records.push(rec.iter().map(str::to_string).collect());
    }

    Ok(CsvTable { headers, records })
}

fn write_table_atomic(path: &Path, table: &CsvTable) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let io = |e: std::io::Error| StoreError::Io(format!("write '{}': {e}", path.display()));

    let mut tmp = NamedTempFile::new_in(dir).map_err(io)?;
    {
        // Short records are written back as read.
        let mut wtr = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(tmp.as_file_mut());
        wtr.write_record(&table.headers)
            .map_err(|e| StoreError::Io(format!("write '{}': {e}", path.display())))?;
        for rec in &table.records {
            wtr.write_record(rec)
                .map_err(|e| StoreError::Io(format!("write '{}': {e}", path.display())))?;
        }
        wtr.flush().map_err(io)?;
    }
    tmp.as_file_mut().flush().map_err(io)?;
    tmp.as_file().sync_all().map_err(io)?;
    tmp.persist(path).map_err(|e| io(e.error))?;
    Ok(())
}
