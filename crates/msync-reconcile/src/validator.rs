//! Batch-level gates.
//!
//! # Key rules
//!
//! - A batch key is **missing** when the cell is empty or holds only
//!   whitespace.
//! - Two batch keys are **duplicates** when they are equal after trimming.
//!   Missing keys all trim to the empty key, so two or more key-less rows
//!   are reported as duplicates.
//! - Matching against the manifest uses the key exactly as written
//!   (untrimmed); see [`crate::ManifestIndex`].
//!
//! The duplicate gate runs before the missing-key gate. Both complete before
//! any row is resolved, so a failing batch never produces a write.

use std::collections::HashMap;

use msync_schemas::DatasetRow;

use crate::error::{DuplicateContext, ReconcileError};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Include the offending key / row position in batch-level errors.
    pub name_offending_rows: bool,
}

/// One batch row that passed the gates, with its key resolved.
#[derive(Clone, Copy, Debug)]
pub struct BatchEntry<'a> {
    /// 1-based position in batch order.
    pub position: usize,
    /// Key text exactly as it appears in the row.
    pub key: &'a str,
    pub row: &'a DatasetRow,
}

/// A batch that passed every batch-level gate.
///
/// Only [`validate_batch`] constructs this, so holding one is proof that the
/// gates ran. Iteration preserves batch input order.
#[derive(Debug)]
pub struct ValidatedBatch<'a> {
    rows: &'a [DatasetRow],
    keys: Vec<String>,
}

impl<'a> ValidatedBatch<'a> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = BatchEntry<'_>> {
        self.rows
            .iter()
            .zip(self.keys.iter())
            .enumerate()
            .map(|(i, (row, key))| BatchEntry {
                position: i + 1,
                key: key.as_str(),
                row,
            })
    }
}

/// Run the batch-level gates over `batch`, reading keys from `key_field`.
pub fn validate_batch<'a>(
    batch: &'a [DatasetRow],
    key_field: &str,
    opts: ValidationOptions,
) -> Result<ValidatedBatch<'a>, ReconcileError> {
    let raw_keys: Vec<Option<String>> = batch
        .iter()
        .map(|row| row.key_text(key_field).filter(|k| !k.trim().is_empty()))
        .collect();

    // 1) Duplicates over every row (trimmed comparison). Missing keys all
    //    count as the empty key, so two key-less rows are duplicates.
    {
        let mut first_seen: HashMap<&str, usize> = HashMap::with_capacity(raw_keys.len());
        for (i, key) in raw_keys.iter().enumerate() {
            let trimmed = key.as_deref().map_or("", str::trim);
            if let Some(&first) = first_seen.get(trimmed) {
                let context = opts.name_offending_rows.then(|| DuplicateContext {
                    key: trimmed.to_string(),
                    first_row: first + 1,
                    second_row: i + 1,
                });
                return Err(ReconcileError::DuplicateBatchKey { context });
            }
            first_seen.insert(trimmed, i);
        }
    }

    // 2) Missing keys.
    let mut keys = Vec::with_capacity(raw_keys.len());
    for (i, key) in raw_keys.into_iter().enumerate() {
        match key {
            Some(k) => keys.push(k),
            None => {
                let row = opts.name_offending_rows.then_some(i + 1);
                return Err(ReconcileError::MissingSampleId { row });
            }
        }
    }

    Ok(ValidatedBatch { rows: batch, keys })
}
