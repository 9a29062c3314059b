//! zane-operator: provisions the application login role and template database grants.
//!
//! Reads its configuration from the environment (and `.env`, when present), runs the
//! bootstrap once (twice with `BOOTSTRAP_VERIFY_IDEMPOTENT`), and exits 0 on success
//! or 1 after printing a single `bootstrap.role.failed` line to stderr.

use std::{io::Write, path::PathBuf, process::ExitCode};

use db::DBService;
use services::services::{
    bootstrap::{PassOutcome, bootstrap},
    config::{Environment, load_config},
};
use tracing::{info, warn};
use utils::events::BootstrapEvent;

fn emit(event: BootstrapEvent) {
    if let Err(e) = event.emit() {
        warn!(event = event.name(), error = %e, "Failed to write bootstrap event");
    }
}

async fn run(env: &Environment) -> anyhow::Result<Vec<PassOutcome>> {
    let config = load_config(env)?;
    info!(?config, "Loaded bootstrap configuration");

    let db = DBService::connect(&config.admin).await?;
    let result = bootstrap(&db, &config, emit).await;
    db.close().await;

    Ok(result?)
}

/// A missing `.env` is normal; any other load error is worth a warning.
fn dotenv_error(result: dotenvy::Result<PathBuf>) -> Option<dotenvy::Error> {
    match result {
        Err(e) if !e.not_found() => Some(e),
        _ => None,
    }
}

/// Map the run result to an exit code, writing the failure event to `err_out`.
fn report<W: Write>(result: anyhow::Result<Vec<PassOutcome>>, err_out: W) -> ExitCode {
    match result {
        Ok(outcomes) => {
            info!(passes = outcomes.len(), "Bootstrap finished");
            ExitCode::SUCCESS
        }
        Err(err) => {
            let event = BootstrapEvent::Failed {
                message: err.to_string(),
            };
            if let Err(e) = event.write_to(err_out) {
                warn!(error = %e, "Failed to write bootstrap failure event");
            }
            ExitCode::FAILURE
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Variables already in the environment take precedence over `.env`.
    let dotenv = dotenvy::dotenv();
    utils::log::init_tracing();
    if let Some(e) = dotenv_error(dotenv) {
        warn!(error = %e, "Failed to load .env file");
    }

    let env = Environment::from_process();
    let result = run(&env).await;
    report(result, std::io::stderr().lock())
}
