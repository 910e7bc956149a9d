use clap::Parser;
use futures_bot::cli::{Cli, Commands};
use futures_bot::config::Config;
use futures_bot::strategy::StrategyError;
use futures_bot::telemetry::{increment, CounterMetric};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Variables already set in the environment take precedence over .env
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: could not read .env file: {}", e);
        }
    }

    let cli = Cli::parse();

    let config = Config::load_or_default(&cli.config)?;

    let _telemetry = futures_bot::telemetry::init_telemetry(&config.telemetry)?;

    let command = cli.command.name();
    let (prepared, session) = match cli.command.launch(config, cli.paper) {
        Ok(started) => started,
        Err(e) => return Ok(fail(&cli.command, &e)),
    };

    let cancel = session.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping at the next safe point");
            cancel.cancel();
        }
    });

    tracing::info!(command, "Starting");
    match prepared.run(&session).await {
        Ok(completion) => Ok(completion.exit_code()),
        Err(e) => Ok(fail(&cli.command, &e)),
    }
}

fn fail(command: &Commands, e: &StrategyError) -> ExitCode {
    increment(CounterMetric::StrategyFailures, command.name());
    tracing::error!(command = command.name(), error = %e, "Command failed");
    println!(
        "❌ {}. Check bot.log for details.",
        command.failure_message()
    );
    eprintln!("Error: {}", e);
    ExitCode::FAILURE
}
