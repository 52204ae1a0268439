//! Command handler modules for msync.
//!
//! Shared config and dataset wiring lives here. Command-specific logic lives
//! in the submodules.

pub mod audit;
pub mod sync;

use anyhow::{Context, Result};
use msync_config::{report_unused_keys, LoadedConfig, SyncConfig, UnusedKeyPolicy};
use msync_store::CsvDataset;
use std::path::PathBuf;
use tracing::warn;

use crate::SyncArgs;

/// Load, guard and type the layered config named by `args`.
pub fn load_config(args: &SyncArgs) -> Result<(LoadedConfig, SyncConfig)> {
    let path_refs: Vec<&str> = args
        .config_paths
        .iter()
        .map(|s| s.as_str())
        .filter(|s| !s.trim().is_empty())
        .collect();
    let loaded = msync_config::load_layered_yaml(&path_refs)?;

    let policy = if args.strict_config {
        UnusedKeyPolicy::Fail
    } else {
        UnusedKeyPolicy::Warn
    };
    let report = report_unused_keys(&loaded.config_json, policy)?;
    if !report.is_clean() {
        warn!(
            unused_leaf_keys = report.unused_leaf_pointers.len(),
            "CONFIG_UNUSED_KEYS"
        );
        for p in report.unused_leaf_pointers.iter().take(50) {
            warn!(unused = %p, "config key not read");
        }
    }

    let cfg = loaded.sync_config().context("config rejected")?;
    Ok((loaded, cfg))
}

/// CSV store for the two configured datasets. Flags win over config paths.
pub fn csv_store(args: &SyncArgs, cfg: &SyncConfig) -> Result<CsvDataset> {
    let manifest = dataset_path(
        args.manifest.as_deref(),
        cfg.datasets.manifest.path.as_ref(),
        &cfg.datasets.manifest.name,
        "datasets.manifest.path",
        "--manifest",
    )?;
    let batch = dataset_path(
        args.batch.as_deref(),
        cfg.datasets.batch.path.as_ref(),
        &cfg.datasets.batch.name,
        "datasets.batch.path",
        "--batch",
    )?;

    Ok(CsvDataset::new()
        .with_file(cfg.datasets.manifest.name.clone(), manifest)
        .with_file(cfg.datasets.batch.name.clone(), batch))
}

fn dataset_path(
    flag: Option<&str>,
    configured: Option<&PathBuf>,
    dataset: &str,
    key: &str,
    flag_name: &str,
) -> Result<PathBuf> {
    if let Some(p) = flag {
        return Ok(PathBuf::from(p));
    }
    configured.cloned().with_context(|| {
        format!("no file configured for dataset '{dataset}': set {key} or pass {flag_name}")
    })
}
