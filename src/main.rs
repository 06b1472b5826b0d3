//! dbx-query - run SQL statements on Databricks SQL warehouses.

use dbx_query::cli::Cli;
use dbx_query::config::{Config, WorkspaceConfig};
use dbx_query::error::{QueryError, Result};
use dbx_query::logging;
use dbx_query::query::QueryExecutor;
use dbx_query::transport::HttpTransport;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    logging::init_stderr_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;

    let workspace = resolve_workspace(&cli, &config);
    debug!("Workspace: {:?}", workspace);

    let credentials = workspace.credentials()?;
    let warehouse = workspace
        .warehouse_id
        .clone()
        .filter(|w| !w.trim().is_empty())
        .ok_or_else(|| {
            QueryError::config("No warehouse configured. Use --warehouse or DATABRICKS_WAREHOUSE_ID")
        })?;
    let timeout = cli
        .timeout
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.execution.timeout());
    let sql = cli.read_sql()?;

    let transport = HttpTransport::new(&credentials, config.execution.request_timeout())?;
    let executor = QueryExecutor::new(Arc::new(transport), &config.execution);
    let result = executor.execute(&warehouse, &sql, timeout).await?;

    let json = if cli.compact {
        serde_json::to_string(&result)
    } else {
        serde_json::to_string_pretty(&result)
    }
    .map_err(|e| QueryError::transport(format!("Failed to serialize result: {e}")))?;
    println!("{json}");

    Ok(())
}

/// Resolves the workspace settings with precedence:
/// 1. CLI arguments (highest)
/// 2. Config file
/// 3. Environment variables
fn resolve_workspace(cli: &Cli, config: &Config) -> WorkspaceConfig {
    let mut workspace = config.workspace.clone();
    workspace.merge(&cli.to_workspace_config());
    workspace.apply_env_defaults();
    workspace
}
