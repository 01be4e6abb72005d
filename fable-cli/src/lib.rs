//! Command-line interface for importing a Fable library into SQLite.
#![forbid(unsafe_code)]

use std::time::Duration;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use fable_data::{
    BookStore, HttpPageSource, HttpPageSourceConfig, ImportReport, PageSource, PageUrl,
    import_all,
};
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

mod error;

pub use error::CliError;

const ARG_START_URL: &str = "start-url";
const ARG_DATABASE: &str = "database";
const ARG_TIMEOUT_SECS: &str = "timeout-secs";
const ARG_USER_AGENT: &str = "user-agent";
const ENV_START_URL: &str = "FABLE_IMPORT_CMDS_IMPORT_START_URL";

const DEFAULT_DATABASE: &str = "db/book.db";

/// Run the CLI with the current process arguments and environment.
pub fn run() -> Result<ImportReport, CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Import(args) => run_import(args),
    }
}

fn run_import(args: ImportArgs) -> Result<ImportReport, CliError> {
    let config = args.into_config()?;
    let source = HttpPageSource::with_config(config.source_config())?;
    execute(&source, &config)
}

/// Open the database and walk every page from the configured start URL.
fn execute<S>(source: &S, config: &ImportConfig) -> Result<ImportReport, CliError>
where
    S: PageSource + ?Sized,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    let mut store = BookStore::open(&config.database).map_err(|source| CliError::OpenStore {
        path: config.database.clone(),
        source,
    })?;
    info!(
        "importing from {} into {}",
        config.start_url, config.database
    );
    runtime
        .block_on(import_all(source, config.start_url.clone(), &mut store))
        .map_err(CliError::Import)
}

#[derive(Debug, Parser)]
#[command(
    name = "fable-import",
    about = "Copy a Fable reading list into a local SQLite database",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch every page of the book list and store it.
    Import(ImportArgs),
}

/// CLI arguments for the `import` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Walk the paginated books endpoint from the start URL, \
                 following each page's next link, and commit every page \
                 to the SQLite database. Options can come from CLI flags, \
                 configuration files, or environment variables.",
    about = "Import the book list into SQLite"
)]
#[ortho_config(prefix = "FABLE_IMPORT")]
struct ImportArgs {
    /// URL of the first page of the book list.
    #[arg(long = ARG_START_URL, value_name = "url")]
    #[serde(default)]
    start_url: Option<String>,
    /// Path of the SQLite database file [default: db/book.db].
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    database: Option<Utf8PathBuf>,
    /// Request timeout in seconds [default: 30].
    #[arg(long = ARG_TIMEOUT_SECS, value_name = "seconds")]
    #[serde(default)]
    timeout_secs: Option<u64>,
    /// User agent sent with every request.
    #[arg(long = ARG_USER_AGENT, value_name = "agent")]
    #[serde(default)]
    user_agent: Option<String>,
}

impl ImportArgs {
    fn into_config(self) -> Result<ImportConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ImportConfig::try_from(merged)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ImportConfig {
    start_url: PageUrl,
    database: Utf8PathBuf,
    timeout: Duration,
    user_agent: String,
}

impl ImportConfig {
    fn source_config(&self) -> HttpPageSourceConfig {
        HttpPageSourceConfig::default()
            .with_timeout(self.timeout)
            .with_user_agent(self.user_agent.clone())
    }
}

impl TryFrom<ImportArgs> for ImportConfig {
    type Error = CliError;

    fn try_from(args: ImportArgs) -> Result<Self, Self::Error> {
        let raw_url = args
            .start_url
            .filter(|value| !value.trim().is_empty())
            .ok_or(CliError::MissingArgument {
                field: ARG_START_URL,
                env: ENV_START_URL,
            })?;
        let start_url =
            PageUrl::parse(raw_url.trim()).map_err(|source| CliError::InvalidStartUrl {
                field: ARG_START_URL,
                value: raw_url.clone(),
                source,
            })?;

        let timeout = match args.timeout_secs {
            Some(0) => {
                return Err(CliError::InvalidTimeout {
                    field: ARG_TIMEOUT_SECS,
                    value: 0,
                });
            }
            Some(secs) => Duration::from_secs(secs),
            None => fable_data::pages::DEFAULT_TIMEOUT,
        };

        Ok(Self {
            start_url,
            database: args
                .database
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DATABASE)),
            timeout,
            user_agent: args
                .user_agent
                .unwrap_or_else(|| fable_data::pages::DEFAULT_USER_AGENT.to_owned()),
        })
    }
}

#[cfg(test)]
mod tests;
