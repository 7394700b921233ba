use anyhow::Context;
use clap::Parser;
use station_etl::cli::{run, Cli};
use std::fs::File;
use std::path::Path;
use std::process;
use std::sync::Mutex;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool, quiet: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let default_level = match (verbose, quiet) {
        (true, _) => "station_etl=debug,info",
        (_, true) => "warn",
        _ => "info",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.quiet, cli.log_file.as_deref()) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }

    let result = run(cli).await.context("station-etl failed");

    if let Err(err) = result {
        error!("{}", err);
        for cause in err.chain().skip(1) {
            error!("  caused by: {}", cause);
        }
        eprintln!("Error: {:#}", err);
        process::exit(1);
    }
}
