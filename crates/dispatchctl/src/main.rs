//! dispatchctl - ambulance dispatch console
//!
//! Picks an open incident, sends the nearest ambulance to it and on to the
//! nearest hospital, narrating each stage on the terminal.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dispatch_shared::{Stage, VERSION};
use dispatchctl::report::{self, ReportRequest, DEFAULT_REPORT_FILE};
use dispatchctl::{
    cancel_pair, logging, Config, ConsoleReporter, DispatchSession, Dispatcher, HttpDispatchClient,
    TerminalMap,
};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "dispatchctl")]
#[command(about = "Ambulance dispatch console", long_about = None)]
#[command(version = VERSION)]
struct Cli {
    /// Config file (defaults to the per-user config)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Override the dispatch service URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Override the animation tick in milliseconds
    #[arg(long, global = true)]
    tick_ms: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one dispatch session (default)
    Run,

    /// Generate a patient report document
    Report {
        /// Patient name
        #[arg(long)]
        name: String,

        /// Patient condition
        #[arg(long)]
        condition: String,

        /// Output file
        #[arg(long, default_value = DEFAULT_REPORT_FILE)]
        out: PathBuf,
    },

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let mut config = Config::load(cli.config.as_deref());
    if let Some(url) = cli.base_url {
        config.service.base_url = url;
    }
    if let Some(ms) = cli.tick_ms {
        config.animation.tick_delay_ms = ms;
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(&config).await,
        Commands::Report {
            name,
            condition,
            out,
        } => generate_report(&config, &name, &condition, &out).await,
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

async fn run(config: &Config) -> Result<()> {
    let client = HttpDispatchClient::new(&config.service)?;
    info!("Dispatch service at {}", client.url(""));

    let dispatcher = Dispatcher::new(
        Arc::new(client),
        Arc::new(TerminalMap::new(config.map.icon_size)),
        Arc::new(ConsoleReporter::new()),
        config,
    );

    let (canceller, token) = cancel_pair();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupted, cancelling dispatch");
                canceller.cancel();
            }
            Err(e) => warn!("Cannot listen for Ctrl-C: {}", e),
        }
    });

    let session = dispatcher.run(token).await;
    let trail: Vec<String> = session.history().iter().map(|s| s.to_string()).collect();
    info!("Session {} stages: {}", session.id(), trail.join(" -> "));

    finish(&session)
}

/// Turn the session's terminal stage into the process result. A failed
/// session becomes an error, so `main` exits non-zero after the runtime
/// and the spinner have shut down.
fn finish(session: &DispatchSession) -> Result<()> {
    match session.stage() {
        Stage::Failed { at, cause } => {
            eprintln!("{} {} ({})", "Dispatch failed at".red(), at, cause);
            bail!("dispatch session {} failed at {}: {}", session.id(), at, cause)
        }
        stage => {
            println!("{} {}", "Dispatch finished:".green(), stage);
            Ok(())
        }
    }
}

async fn generate_report(
    config: &Config,
    name: &str,
    condition: &str,
    out: &std::path::Path,
) -> Result<()> {
    let request = ReportRequest::new(name, condition)?;
    let client = HttpDispatchClient::new(&config.service)?;
    let reporter = ConsoleReporter::new();
    let written = report::generate_report(&client, &reporter, &request, out)
        .await
        .with_context(|| format!("Report for {} not generated", request.patient_name))?;
    info!("{} bytes written", written);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch_shared::{Completion, DispatchError, FailurePoint, SearchOutcome};

    fn walk(session: &mut DispatchSession, stages: Vec<Stage>) {
        for s in stages {
            session.advance(s).unwrap();
        }
    }

    #[test]
    fn test_failed_session_is_an_error() {
        let mut session = DispatchSession::new();
        walk(
            &mut session,
            vec![Stage::Failed {
                at: FailurePoint::IncidentSelection,
                cause: DispatchError::EmptyCandidateSet,
            }],
        );
        let err = finish(&session).unwrap_err();
        assert!(err.to_string().contains("incident-selection"));
    }

    #[test]
    fn test_done_session_is_ok() {
        let mut session = DispatchSession::new();
        walk(
            &mut session,
            vec![
                Stage::IncidentSelected,
                Stage::ZoneClassified,
                Stage::ResponderSearch(SearchOutcome::NotFound),
                Stage::Done(Completion::NoResponder),
            ],
        );
        assert!(finish(&session).is_ok());
    }
}
