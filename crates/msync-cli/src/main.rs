use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "msync")]
#[command(about = "Manifest sync: merge a CSV batch into the sample manifest", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(clap::Args, Debug, Clone)]
pub struct SyncArgs {
    /// Layered config paths in merge order. Falls back to MSYNC_CONFIG
    /// (comma separated); with neither, built-in defaults apply.
    #[arg(long = "config", env = "MSYNC_CONFIG", value_delimiter = ',')]
    pub config_paths: Vec<String>,

    /// Manifest CSV (overrides datasets.manifest.path)
    #[arg(long)]
    pub manifest: Option<String>,

    /// Batch CSV (overrides datasets.batch.path)
    #[arg(long)]
    pub batch: Option<String>,

    /// Fail instead of warn when the config has keys nothing reads.
    #[arg(long, default_value_t = false)]
    pub strict_config: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the batch and merge it into the manifest
    Run {
        #[command(flatten)]
        args: SyncArgs,

        /// Audit log path (overrides audit.path)
        #[arg(long)]
        audit: Option<String>,
    },

    /// Validate and resolve every batch row without writing
    Check {
        #[command(flatten)]
        args: SyncArgs,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> site -> run...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Audit trail utilities
    Audit {
        #[command(subcommand)]
        cmd: AuditCmd,
    },
}

#[derive(Subcommand)]
enum AuditCmd {
    /// Verify the hash chain of an audit log
    Verify {
        #[arg(long)]
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Missing .env.local is fine.
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Run { args, audit } => commands::sync::run(args, audit).await?,
        Commands::Check { args } => commands::sync::check(args).await?,
        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = msync_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }
        Commands::Audit { cmd } => match cmd {
            AuditCmd::Verify { path } => commands::audit::verify(&path)?,
        },
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
