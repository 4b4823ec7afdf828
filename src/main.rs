//! Binary entry point for repoqa.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use repoqa::cli::output::{format_error, OutputFormat};
use repoqa::cli::{execute, Cli};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let format = OutputFormat::parse(&cli.format);

    let default_filter = if cli.verbose { "repoqa=debug" } else { "repoqa=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(io::stderr)
        .init();

    match execute(&cli).await {
        Ok(output) => {
            if !output.is_empty() {
                // Handle broken pipe gracefully (e.g., when piped to `head`)
                if let Err(e) = writeln!(io::stdout(), "{output}") {
                    if e.kind() != io::ErrorKind::BrokenPipe {
                        eprintln!("Error writing to stdout: {e}");
                        return ExitCode::FAILURE;
                    }
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            let rendered = format_error(&e, format);
            match format {
                OutputFormat::Json => println!("{rendered}"),
                OutputFormat::Text => eprintln!("Error: {rendered}"),
            }
            ExitCode::FAILURE
        }
    }
}
