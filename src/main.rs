mod catalog;
mod config;
mod error;
mod remote;
mod sync;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use catalog::{CatalogSnapshot, CatalogStore, MemoryStore};
use config::AppConfig;
use remote::{HttpPlatform, MemoryPlatform, RemotePlatform};
use sync::{
    BatchRunner, CandidateSelector, FileAuditLog, ProductExporter, RunnerConfig, TimeBudget,
    DEFAULT_SYNC_LIMIT,
};

#[derive(Parser)]
#[command(
    name = "outflow",
    version,
    about = "Batch synchronization of catalog objects to external target servers"
)]
struct Cli {
    /// TOML configuration file (defaults to the platform config dir).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Catalog snapshot (JSON) loaded into the in-memory store.
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one synchronization batch against a target server.
    Sync {
        /// Key of the target server.
        #[arg(long)]
        server: String,
        /// Object class to synchronize.
        #[arg(long, default_value = "product")]
        class: String,
        /// Flat batch size, overridden by a time budget when supplied.
        #[arg(long, default_value_t = DEFAULT_SYNC_LIMIT)]
        limit: usize,
        /// Total wall-clock seconds available to the run.
        #[arg(long)]
        exec_time: Option<u64>,
        /// Seconds reserved as a safety tail at the end of the window.
        #[arg(long)]
        max_sync_time: Option<u64>,
        /// Expected seconds per object export.
        #[arg(long)]
        typical_sync_time: Option<u64>,
        /// Export against an in-memory platform instead of the real server.
        #[arg(long)]
        dry_run: bool,
    },
    /// Preview which objects the next run would select.
    Candidates {
        #[arg(long)]
        server: String,
        #[arg(long, default_value = "product")]
        class: String,
        #[arg(long, default_value_t = DEFAULT_SYNC_LIMIT)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let app_config = AppConfig::load(cli.config.as_deref())?;
    let store = build_store(cli.catalog.as_ref(), &app_config).await?;

    match cli.command {
        Command::Sync {
            server,
            class,
            limit,
            exec_time,
            max_sync_time,
            typical_sync_time,
            dry_run,
        } => {
            let budget = build_budget(exec_time, max_sync_time, typical_sync_time);
            let platform = build_platform(&app_config, &server, dry_run)?;

            let audit_path = app_config
                .audit_log
                .clone()
                .unwrap_or_else(|| PathBuf::from("sync-objects.log"));
            let audit = Arc::new(FileAuditLog::new(audit_path)?);

            let mut runner_config = RunnerConfig::default();
            if let Some(timeout) = app_config.export_timeout() {
                runner_config.export_timeout = timeout;
            }

            let exporter = Arc::new(ProductExporter::new(store.clone(), platform));
            let runner =
                BatchRunner::new(store, exporter, audit).with_config(runner_config);

            let result = runner.run_sync(&server, &class, limit, budget).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Candidates {
            server,
            class,
            limit,
        } => {
            let target = store
                .server(&server)
                .await?
                .filter(|s| s.enabled)
                .with_context(|| format!("target server '{server}' not found or disabled"))?;

            let selector = CandidateSelector::new(store);
            let candidates = selector.select(&target, &class, limit, None).await?;
            println!("{}", serde_json::to_string_pretty(&candidates)?);
        }
    }

    Ok(())
}

/// Build the catalog store from the optional snapshot file and register the
/// configured servers.
async fn build_store(
    snapshot_path: Option<&PathBuf>,
    app_config: &AppConfig,
) -> Result<Arc<dyn CatalogStore>> {
    let store = match snapshot_path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read catalog {}", path.display()))?;
            let snapshot: CatalogSnapshot = serde_json::from_str(&raw)
                .with_context(|| format!("invalid catalog snapshot {}", path.display()))?;
            MemoryStore::from_snapshot(snapshot).await
        }
        None => MemoryStore::new(),
    };

    for server in &app_config.servers {
        store.insert_server(server.to_server()).await;
    }
    Ok(Arc::new(store))
}

/// All three budget fields must be present together; otherwise the budget
/// is ignored entirely and the flat limit applies.
fn build_budget(
    exec_time: Option<u64>,
    max_sync_time: Option<u64>,
    typical_sync_time: Option<u64>,
) -> Option<TimeBudget> {
    match (exec_time, max_sync_time, typical_sync_time) {
        (Some(exec), Some(max), Some(typical)) => Some(TimeBudget::new(exec, max, typical)),
        (None, None, None) => None,
        _ => {
            warn!(
                "time budget ignored: exec-time, max-sync-time and typical-sync-time \
                 must be supplied together"
            );
            None
        }
    }
}

fn build_platform(
    app_config: &AppConfig,
    server_key: &str,
    dry_run: bool,
) -> Result<Arc<dyn RemotePlatform>> {
    if dry_run {
        return Ok(Arc::new(MemoryPlatform::new()));
    }
    let server = app_config
        .server(server_key)
        .with_context(|| format!("server '{server_key}' is not configured"))?;
    let Some(endpoint) = &server.endpoint else {
        bail!("server '{server_key}' has no endpoint configured; use --dry-run to test");
    };
    Ok(Arc::new(HttpPlatform::new(
        endpoint.clone(),
        server.token.clone(),
    )?))
}
