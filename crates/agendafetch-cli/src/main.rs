//! agendafetch CLI entry point.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use agendafetch_core::{TracingConfig, init_tracing};
use agendafetch_providers::{ConferenceFetcher, SiteCapabilityRegistry};

use agendafetch_cli::cli::Cli;
use agendafetch_cli::commands;
use agendafetch_cli::config::CliConfig;
use agendafetch_cli::error::CliResult;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let mut config = match cli.config {
        Some(ref path) => CliConfig::load_from(path)?,
        None => CliConfig::load()?,
    };
    init_tracing(TracingConfig::from_debug_flag(cli.debug || config.debug))?;

    if let Some(ref path) = cli.key_file {
        config.apply_key_file(path)?;
    }
    if let Some(ref agent) = cli.user_agent {
        config.http.user_agent = Some(agent.clone());
    }
    if let Some(timeout) = cli.timeout {
        config.http.timeout = timeout;
    }
    if cli.insecure {
        config.http.verify_tls = false;
    }

    if let Some(ref path) = cli.input {
        println!("{}", commands::normalize_file(path, &cli.site).await?);
        return Ok(());
    }

    let fetcher = ConferenceFetcher::from_config(
        &config.to_fetcher_config(),
        Arc::new(SiteCapabilityRegistry::new()),
    )?;

    if let Some(ref url) = cli.category {
        println!("{}", commands::category(&fetcher, url, cli.days).await?);
        return Ok(());
    }

    for output in commands::fetch(&fetcher, &cli.agendas, cli.output_mode()).await? {
        println!("{}", output);
    }
    Ok(())
}
