//! Entry point for the `fable-import` binary.
#![forbid(unsafe_code)]

use fable_cli::CliError;
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    match fable_cli::run() {
        Ok(_) => println!("done"),
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => {
            eprintln!("fable-import: {err}");
            std::process::exit(1);
        }
    }
}
