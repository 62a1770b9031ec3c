// Restore console binary entry point
// Drives the restore engine against a director console from the command line

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use restore_engine::config::Settings;
use restore_engine::console::TcpConsoleConnector;
use restore_engine::errors::{ApiError, RestoreError};
use restore_engine::models::{ReplacePolicy, RestoreScope, RestoreSelection, ScopeType};
use restore_engine::restore::RestoreService;
use restore_engine::telemetry;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "bvfs-restore")]
#[command(about = "Browse backup catalogs and submit restores through the director console", long_about = None)]
struct Cli {
    /// Directory holding default.toml / local.toml
    #[arg(long, default_value = "config", env = "RESTORE_CONFIG_DIR")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List client names
    Clients,
    /// List restore job names
    RestoreJobs,
    /// Resolve the job ids taking part in a restore
    Jobids(ScopeArgs),
    /// List the children of a tree node
    Browse {
        #[command(flatten)]
        scope: ScopeArgs,
        /// Node id from a previous listing; omit for the root
        #[arg(long)]
        node: Option<String>,
    },
    /// List stored versions of one file
    Versions {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long)]
        path_id: String,
        #[arg(long)]
        name: String,
    },
    /// Refresh the BVFS cache
    UpdateCache {
        /// Comma-joined job ids; all jobs when omitted
        #[arg(long)]
        job_id: Option<String>,
    },
    /// Submit a restore of the given tree node ids
    Restore {
        #[command(flatten)]
        scope: ScopeArgs,
        /// Checked node ids (`-<pathid>` for directories, `<fileid>` for files)
        #[arg(long = "select", required = true, num_args = 1.., allow_hyphen_values = true)]
        selected: Vec<String>,
    },
}

#[derive(Debug, Args)]
struct ScopeArgs {
    /// Client whose backups are restored
    #[arg(long, default_value = "")]
    client: String,
    /// Seed job id; the client's latest backup when omitted
    #[arg(long)]
    job_id: Option<String>,
    #[arg(long)]
    fileset: Option<String>,
    /// Expand across all filesets of the client
    #[arg(long)]
    no_merge_filesets: bool,
    /// Do not merge related jobs
    #[arg(long)]
    no_merge_jobs: bool,
    #[arg(long, default_value = "")]
    restore_job: String,
    #[arg(long, default_value = "")]
    restore_client: String,
    #[arg(long = "where")]
    where_path: Option<String>,
    #[arg(long)]
    replace: Option<ReplacePolicy>,
}

impl ScopeArgs {
    fn into_scope(self, settings: &Settings) -> RestoreScope {
        let restore = &settings.restore;
        RestoreScope {
            scope_type: if self.job_id.is_some() {
                ScopeType::SingleJob
            } else {
                ScopeType::Client
            },
            client: self.client,
            job_id: self.job_id,
            merge_filesets: restore.merge_filesets && !self.no_merge_filesets,
            merge_jobs: restore.merge_jobs && !self.no_merge_jobs,
            fileset: self.fileset,
            restore_job: self.restore_job,
            restore_client: self.restore_client,
            where_path: self
                .where_path
                .unwrap_or_else(|| restore.default_where.clone()),
            replace: self.replace.unwrap_or(restore.default_replace),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load_from_path(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    settings
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    telemetry::init_logging(
        &settings.observability.log_level,
        settings.observability.json_logs,
    )?;
    telemetry::describe_metrics();

    info!(
        host = %settings.console.host,
        port = settings.console.port,
        "Starting restore console"
    );

    let connector = Arc::new(TcpConsoleConnector::new(settings.console.clone()));
    let service = RestoreService::new(connector, settings.restore.clone());

    if let Err(e) = run(cli.command, &service, &settings).await {
        error!(error = %e, "Command failed");
        let report = error_report(e)?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        std::process::exit(1);
    }
    Ok(())
}

/// Engine failures become a JSON report on stdout; anything else stays an error
fn error_report(err: anyhow::Error) -> Result<ApiError> {
    err.downcast::<RestoreError>().map(ApiError::from)
}

async fn run(command: Commands, service: &RestoreService, settings: &Settings) -> Result<()> {
    let output = match command {
        Commands::Clients => serde_json::to_value(service.clients().await?)?,
        Commands::RestoreJobs => serde_json::to_value(service.restore_jobs().await?)?,
        Commands::Jobids(scope) => {
            let session = service.open_session(scope.into_scope(settings)).await?;
            serde_json::to_value(session.job_ids())?
        }
        Commands::Browse { scope, node } => {
            let session = service.open_session(scope.into_scope(settings)).await?;
            serde_json::to_value(service.browse(&session, node.as_deref()).await?)?
        }
        Commands::Versions {
            scope,
            path_id,
            name,
        } => {
            let session = service.open_session(scope.into_scope(settings)).await?;
            serde_json::to_value(service.file_versions(&session, &path_id, &name).await?)?
        }
        Commands::UpdateCache { job_id } => {
            service.update_cache(job_id.as_deref()).await?;
            serde_json::json!({ "updated": true })
        }
        Commands::Restore { scope, selected } => {
            let mut session = service.open_session(scope.into_scope(settings)).await?;
            let selection =
                RestoreSelection::from_checked_nodes(session.scope(), session.job_ids(), &selected);
            serde_json::to_value(service.submit(&mut session, &selection).await?)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
