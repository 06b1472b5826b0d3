//! Command-line argument parsing for dbx-query.

use crate::config::WorkspaceConfig;
use crate::error::{QueryError, Result};
use clap::Parser;
use std::io::Read;
use std::path::PathBuf;

/// Run a SQL statement on a Databricks SQL warehouse and print the result as JSON.
#[derive(Parser, Debug)]
#[command(name = "dbx-query")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// SQL statement to execute
    #[arg(value_name = "SQL", conflicts_with = "file")]
    pub sql: Option<String>,

    /// Read the SQL statement from a file ("-" for stdin)
    #[arg(short = 'f', long, value_name = "PATH")]
    pub file: Option<String>,

    /// Workspace URL (e.g., https://<workspace>.cloud.databricks.com)
    #[arg(long = "db-host", value_name = "HOST")]
    pub host: Option<String>,

    /// Personal access token
    #[arg(long = "db-token", value_name = "TOKEN")]
    pub token: Option<String>,

    /// SQL warehouse to run the statement on
    #[arg(short = 'w', long, value_name = "ID")]
    pub warehouse: Option<String>,

    /// Seconds to wait for the statement to finish
    #[arg(short = 't', long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print JSON on a single line
    #[arg(long)]
    pub compact: bool,

    /// Enable debug logging
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Converts CLI arguments to a WorkspaceConfig.
    ///
    /// Only fields given on the command line are set.
    pub fn to_workspace_config(&self) -> WorkspaceConfig {
        WorkspaceConfig {
            host: self.host.clone(),
            token: self.token.clone(),
            warehouse_id: self.warehouse.clone(),
        }
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(crate::config::Config::default_path)
    }

    /// Returns the SQL text from the positional argument, a file or stdin.
    pub fn read_sql(&self) -> Result<String> {
        let sql = match (&self.sql, self.file.as_deref()) {
            (Some(sql), _) => sql.clone(),
            (None, Some("-")) => {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf).map_err(|e| {
                    QueryError::invalid_request(format!("Failed to read stdin: {e}"))
                })?;
                buf
            }
            (None, Some(path)) => std::fs::read_to_string(path).map_err(|e| {
                QueryError::invalid_request(format!("Failed to read SQL file '{}': {e}", path))
            })?,
            (None, None) => {
                return Err(QueryError::invalid_request(
                    "No SQL given. Pass it as an argument or use --file",
                ))
            }
        };

        Ok(sql)
    }
}
