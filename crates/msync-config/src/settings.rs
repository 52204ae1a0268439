//! Typed sync settings.
//!
//! The merged YAML document is layered over [`SyncConfig::default`] before
//! deserialization, so any key a deployment omits keeps the built-in value.
//! The built-in field whitelist is the KCCG manifest layout.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::deep_merge;

pub const DEFAULT_MANIFEST_DATASET: &str = "Manifest";
pub const DEFAULT_BATCH_DATASET: &str = "CSV file";

/// Batch column holding the sample key.
pub const DEFAULT_BATCH_KEY_FIELD: &str = "Sample ID1";
/// Manifest column holding the sample key.
pub const DEFAULT_MANIFEST_KEY_FIELD: &str = "Sample ID";

/// (batch source column, manifest destination column). Note the trailing
/// spaces on two of the source headers; they are part of the column names.
pub const DEFAULT_TRANSFER: &[(&str, &str)] = &[
    ("KCCG FluidX tube ID1", "KCCG FluidX tube ID"),
    (
        "FD tube conc after robot dilution IQC (ng/ul) ",
        "Concentration (ng/ul)*",
    ),
    (
        "Vol left in FD tube after 80ul transfer to DNA plate (ul) ",
        "Volume (ul)*",
    ),
    ("ng available1", "ng available"),
    ("comment", "comments"),
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub datasets: DatasetsConfig,
    pub fields: FieldMapping,
    pub diagnostics: Diagnostics,
    pub audit: AuditConfig,
}

impl SyncConfig {
    /// Layer `config_json` over the defaults, deserialize, and validate.
    pub fn from_json(config_json: &Value) -> Result<Self> {
        let base = serde_json::to_value(SyncConfig::default())
            .context("serialize default sync config failed")?;
        let merged = deep_merge(base, config_json.clone());
        let cfg: SyncConfig =
            serde_json::from_value(merged).context("invalid sync config shape")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.datasets.manifest.name.trim().is_empty() {
            bail!("CONFIG_INVALID: datasets.manifest.name must not be blank");
        }
        if self.datasets.batch.name.trim().is_empty() {
            bail!("CONFIG_INVALID: datasets.batch.name must not be blank");
        }
        if self.datasets.manifest.name == self.datasets.batch.name {
            bail!(
                "CONFIG_INVALID: manifest and batch datasets must differ (both '{}')",
                self.datasets.manifest.name
            );
        }
        self.fields.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetsConfig {
    pub manifest: DatasetConfig,
    pub batch: DatasetConfig,
}

impl Default for DatasetsConfig {
    fn default() -> Self {
        Self {
            manifest: DatasetConfig::named(DEFAULT_MANIFEST_DATASET),
            batch: DatasetConfig::named(DEFAULT_BATCH_DATASET),
        }
    }
}

/// A named dataset and, for file-backed stores, where it lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub name: String,
    pub path: Option<PathBuf>,
}

impl DatasetConfig {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPair {
    pub source: String,
    pub destination: String,
}

impl FieldPair {
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }
}

/// Source-to-destination whitelist.
///
/// `match_key.source` is read from batch rows and `match_key.destination`
/// from manifest rows; the key itself is never written. `transfer` pairs are
/// applied positionally: names on either side are independent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub match_key: FieldPair,
    pub transfer: Vec<FieldPair>,
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            match_key: FieldPair::new(DEFAULT_BATCH_KEY_FIELD, DEFAULT_MANIFEST_KEY_FIELD),
            transfer: DEFAULT_TRANSFER
                .iter()
                .map(|(s, d)| FieldPair::new(*s, *d))
                .collect(),
        }
    }
}

impl FieldMapping {
    pub fn batch_key_field(&self) -> &str {
        &self.match_key.source
    }

    pub fn manifest_key_field(&self) -> &str {
        &self.match_key.destination
    }

    pub fn destinations(&self) -> impl Iterator<Item = &str> {
        self.transfer.iter().map(|p| p.destination.as_str())
    }

    pub fn validate(&self) -> Result<()> {
        if self.match_key.source.trim().is_empty() || self.match_key.destination.trim().is_empty()
        {
            bail!("CONFIG_INVALID: fields.match_key source and destination must not be blank");
        }
        if self.transfer.is_empty() {
            bail!("CONFIG_INVALID: fields.transfer must list at least one field pair");
        }

        let mut seen: BTreeSet<&str> = BTreeSet::new();
        for (i, pair) in self.transfer.iter().enumerate() {
            if pair.source.trim().is_empty() || pair.destination.trim().is_empty() {
                bail!("CONFIG_INVALID: fields.transfer[{i}] has a blank field name");
            }
            if pair.destination == self.match_key.destination {
                bail!(
                    "CONFIG_INVALID: fields.transfer[{i}] writes the manifest key field '{}'",
                    pair.destination
                );
            }
            if !seen.insert(pair.destination.as_str()) {
                bail!(
                    "CONFIG_INVALID: destination '{}' appears more than once in fields.transfer",
                    pair.destination
                );
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Append the offending key / row position to batch-level validation
    /// errors. Off by default: the stock messages do not name the row.
    pub name_offending_rows: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    pub path: Option<PathBuf>,
    pub hash_chain: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            path: None,
            hash_chain: true,
        }
    }
}
