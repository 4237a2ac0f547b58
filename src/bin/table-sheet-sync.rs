use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use table_sheet_sync::{Cli, Config, JobError, RunReport, pipeline};
use tracing::info;
use tracing_subscriber::EnvFilter;

async fn run_job(cli: Cli) -> Result<RunReport> {
    let config = Config::from_cli(cli).context("failed to load configuration")?;
    let report = pipeline::run(&config)
        .await
        .with_context(|| format!("table sync from '{}' failed", config.url))?;
    Ok(report)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return ExitCode::from(Cli::usage_exit_code(&error));
        }
    };

    let default_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("table_sheet_sync={default_level}")));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    match run_job(cli).await {
        Ok(report) => {
            info!(
                "done: {} row(s) x {} column(s) published to {} (table chosen by {:?})",
                report.row_count, report.column_count, report.destination, report.resolved_by
            );
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("error: {error:#}");
            let code = error
                .downcast_ref::<JobError>()
                .map_or(1, JobError::exit_code);
            ExitCode::from(code)
        }
    }
}
