//! Error types emitted by the Fable import CLI.
//!
//! Keep this error type reasonably small, as CLI helpers return
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use fable_data::{ImportError, PersistBooksError, SourceBuildError};
use thiserror::Error;

/// Errors emitted by the Fable import CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// The start URL is not an absolute URL.
    #[error("invalid {field} {value:?}: {source}")]
    InvalidStartUrl {
        field: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },
    /// A numeric option was outside its accepted range.
    #[error("{field} must be at least 1, got {value}")]
    InvalidTimeout { field: &'static str, value: u64 },
    /// Constructing the HTTP page source failed.
    #[error(transparent)]
    BuildPageSource(#[from] SourceBuildError),
    /// Building the async runtime failed.
    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// Opening or preparing the database failed.
    #[error("failed to open book database at {path:?}: {source}")]
    OpenStore {
        path: Utf8PathBuf,
        #[source]
        source: PersistBooksError,
    },
    /// The import stopped on a fetch or persistence failure.
    #[error("import failed: {0}")]
    Import(#[source] ImportError),
}
