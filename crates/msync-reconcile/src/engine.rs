use std::collections::HashMap;

use msync_config::FieldMapping;
use msync_schemas::{DatasetRow, FieldUpdate};

use crate::error::ReconcileError;
use crate::types::MergeInstruction;
use crate::validator::{BatchEntry, ValidatedBatch};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
    Unique(usize),
    Duplicate(usize),
}

/// Outcome of looking a batch key up in the manifest.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Resolution<'a> {
    Unique(&'a DatasetRow),
    Ambiguous { count: usize },
    Missing,
}

/// Key -> manifest row lookup, built once per run.
///
/// Keys are the manifest key cells exactly as stored (no trimming). Rows
/// whose key cell is empty are not indexed. Keys held by more than one row
/// are kept as duplicates so that a lookup reports the clash instead of
/// silently picking one; duplicates the batch never asks for are harmless.
#[derive(Debug)]
pub struct ManifestIndex<'a> {
    rows: &'a [DatasetRow],
    slots: HashMap<String, Slot>,
}

impl<'a> ManifestIndex<'a> {
    pub fn build(rows: &'a [DatasetRow], key_field: &str) -> Self {
        let mut slots: HashMap<String, Slot> = HashMap::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            let Some(key) = row.key_text(key_field) else {
                continue;
            };
            slots
                .entry(key)
                .and_modify(|slot| {
                    *slot = match *slot {
                        Slot::Unique(_) => Slot::Duplicate(2),
                        Slot::Duplicate(n) => Slot::Duplicate(n + 1),
                    }
                })
                .or_insert(Slot::Unique(i));
        }
        Self { rows, slots }
    }

    pub fn resolve(&self, key: &str) -> Resolution<'a> {
        match self.slots.get(key) {
            Some(Slot::Unique(i)) => Resolution::Unique(&self.rows[*i]),
            Some(Slot::Duplicate(n)) => Resolution::Ambiguous { count: *n },
            None => Resolution::Missing,
        }
    }

    /// Number of distinct keys.
    pub fn key_count(&self) -> usize {
        self.slots.len()
    }

    /// Keys held by more than one manifest row, sorted.
    pub fn duplicate_keys(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self
            .slots
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Duplicate(_)))
            .map(|(k, _)| k.as_str())
            .collect();
        out.sort_unstable();
        out
    }
}

/// Resolves validated batch rows against the manifest and builds merge
/// instructions from the configured whitelist.
#[derive(Debug)]
pub struct Reconciler<'a> {
    index: ManifestIndex<'a>,
    mapping: &'a FieldMapping,
}

impl<'a> Reconciler<'a> {
    pub fn new(manifest: &'a [DatasetRow], mapping: &'a FieldMapping) -> Self {
        Self {
            index: ManifestIndex::build(manifest, mapping.manifest_key_field()),
            mapping,
        }
    }

    pub fn index(&self) -> &ManifestIndex<'a> {
        &self.index
    }

    /// Resolve one batch entry to exactly one manifest row.
    pub fn instruction_for(&self, entry: &BatchEntry<'_>) -> Result<MergeInstruction, ReconcileError> {
        let target = match self.index.resolve(entry.key) {
            Resolution::Unique(row) => row,
            Resolution::Ambiguous { count } => {
                return Err(ReconcileError::DuplicateManifestKey {
                    key: entry.key.to_string(),
                    count,
                })
            }
            Resolution::Missing => {
                return Err(ReconcileError::UnmatchedRow {
                    key: entry.key.to_string(),
                })
            }
        };

        Ok(MergeInstruction {
            sample_id: entry.key.to_string(),
            target: target.handle.clone(),
            update: build_update(entry.row, self.mapping),
        })
    }

    /// Resolve the whole batch without side effects. Stops at the first
    /// failing row, in batch order.
    pub fn plan(&self, batch: &ValidatedBatch<'_>) -> Result<Vec<MergeInstruction>, ReconcileError> {
        batch.entries().map(|e| self.instruction_for(&e)).collect()
    }
}

/// Copy whitelisted source cells onto their destination names. Absent or
/// empty source cells transfer as null.
pub fn build_update(source: &DatasetRow, mapping: &FieldMapping) -> FieldUpdate {
    let mut update = FieldUpdate::new();
    for pair in &mapping.transfer {
        update.assign(pair.destination.clone(), source.get_or_null(&pair.source));
    }
    update
}

#[cfg(test)]
mod tests {
    use super::*;
    use msync_schemas::RowHandle;
    use serde_json::{json, Value};

    fn manifest_row(id: &str, key: &str) -> DatasetRow {
        DatasetRow::new(RowHandle::new("Manifest", id)).with_field("Sample ID", key)
    }

    #[test]
    fn index_reports_unique_ambiguous_and_missing() {
        let rows = vec![
            manifest_row("rec1", "S1"),
            manifest_row("rec2", "S2"),
            manifest_row("rec3", "S2"),
            manifest_row("rec4", "S2"),
        ];
        let idx = ManifestIndex::build(&rows, "Sample ID");

        assert_eq!(idx.resolve("S1"), Resolution::Unique(&rows[0]));
        assert_eq!(idx.resolve("S2"), Resolution::Ambiguous { count: 3 });
        assert_eq!(idx.resolve("S3"), Resolution::Missing);
        assert_eq!(idx.key_count(), 2);
        assert_eq!(idx.duplicate_keys(), vec!["S2"]);
    }

    #[test]
    fn matching_is_exact_and_untrimmed() {
        let rows = vec![manifest_row("rec1", "S1")];
        let idx = ManifestIndex::build(&rows, "Sample ID");
        assert_eq!(idx.resolve(" S1"), Resolution::Missing);
        assert_eq!(idx.resolve("s1"), Resolution::Missing);
    }

    #[test]
    fn numeric_and_text_keys_match_on_their_text() {
        let rows = vec![
            DatasetRow::new(RowHandle::new("Manifest", "rec1")).with_field("Sample ID", 1001),
            manifest_row("rec2", "1002"),
        ];
        let idx = ManifestIndex::build(&rows, "Sample ID");
        assert_eq!(idx.resolve("1001"), Resolution::Unique(&rows[0]));
        assert_eq!(idx.resolve("1002"), Resolution::Unique(&rows[1]));
        assert_eq!(idx.resolve("1001.0"), Resolution::Missing);
    }

    #[test]
    fn rows_without_key_are_not_indexed() {
        let rows = vec![
            DatasetRow::new(RowHandle::new("Manifest", "rec1")).with_field("Sample ID", Value::Null),
            DatasetRow::new(RowHandle::new("Manifest", "rec2")),
        ];
        let idx = ManifestIndex::build(&rows, "Sample ID");
        assert_eq!(idx.key_count(), 0);
    }

    #[test]
    fn build_update_is_positional_and_whitelisted() {
        let source = DatasetRow::new(RowHandle::new("CSV file", "r1"))
            .with_field("Sample ID1", "S1")
            .with_field("KCCG FluidX tube ID1", "FX-0001")
            .with_field("FD tube conc after robot dilution IQC (ng/ul) ", 5.0)
            .with_field("Plate", "P07");

        let update = build_update(&source, &FieldMapping::default());

        assert_eq!(
            update.fields().collect::<Vec<_>>(),
            vec![
                "KCCG FluidX tube ID",
                "Concentration (ng/ul)*",
                "Volume (ul)*",
                "ng available",
                "comments",
            ]
        );
        assert_eq!(update.get("KCCG FluidX tube ID"), Some(&json!("FX-0001")));
        assert_eq!(update.get("Concentration (ng/ul)*"), Some(&json!(5.0)));
        assert_eq!(update.get("Volume (ul)*"), Some(&Value::Null));
        assert!(update.get("Plate").is_none());
        assert!(update.get("Sample ID").is_none());
    }
}
