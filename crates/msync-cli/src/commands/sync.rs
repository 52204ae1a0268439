//! `msync run` and `msync check`.

use anyhow::Result;
use msync_audit::AuditWriter;
use msync_runtime::SyncRunner;
use std::path::PathBuf;
use tracing::info;

use super::{csv_store, load_config};
use crate::SyncArgs;

pub async fn run(args: SyncArgs, audit_override: Option<String>) -> Result<()> {
    let (loaded, cfg) = load_config(&args)?;
    let store = csv_store(&args, &cfg)?;

    let audit_path = audit_override
        .map(PathBuf::from)
        .or_else(|| cfg.audit.path.clone());
    let mut audit = match &audit_path {
        Some(p) => Some(AuditWriter::resume(p, cfg.audit.hash_chain)?),
        None => None,
    };

    let mut runner = SyncRunner::new(&cfg);
    info!(run_id = %runner.run_id(), config_hash = %loaded.config_hash, "config loaded");
    if let Some(writer) = audit.as_mut() {
        runner = runner.with_audit(writer);
    }

    match runner.run(&store, &store).await {
        Ok(report) => {
            println!("run_id={}", report.run_id);
            println!("config_hash={}", loaded.config_hash);
            println!("manifest_rows={}", report.manifest_rows);
            println!("batch_rows={}", report.batch_rows);
            println!("rows_merged={}", report.merged.len());
            if let Some(p) = &audit_path {
                println!("audit_path={}", p.display());
            }
            Ok(())
        }
        Err(abort) => {
            println!("run_id={}", abort.run_id);
            println!("rows_merged={}", abort.rows_merged);
            anyhow::bail!("{abort}")
        }
    }
}

pub async fn check(args: SyncArgs) -> Result<()> {
    let (loaded, cfg) = load_config(&args)?;
    let store = csv_store(&args, &cfg)?;

    let plan = match SyncRunner::new(&cfg).plan(&store).await {
        Ok(p) => p,
        Err(abort) => anyhow::bail!("{abort}"),
    };

    println!("config_hash={}", loaded.config_hash);
    println!("manifest_rows={}", plan.manifest_rows);
    println!("batch_rows={}", plan.batch_rows);
    for ins in &plan.instructions {
        println!(
            "plan sample_id={} record_id={} fields={}",
            ins.sample_id,
            ins.target.record_id(),
            ins.update.len()
        );
    }
    println!("check_ok=true");
    Ok(())
}
