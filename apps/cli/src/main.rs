//! `wait-for`: block until network services are ready.
//!
//! Exits with status 0 once every target is up, or prints `Error: <reason>`
//! and exits with status 1.

mod args;
mod config;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::level_filters::LevelFilter;
use tracing::{debug, warn};
use waitfor::{Orchestrator, RunConfig};

use crate::args::Args;
use crate::config::FileConfig;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let file = FileConfig::from_config(args.config.as_deref())?;
    let config = config::merge(&args, file)?;
    logger::init_with_level(log_level(config.verbose));

    config.validate()?;
    println!("{}", banner(&config));

    let interrupt = CancellationToken::new();
    tokio::spawn(cancel_on_signal(interrupt.clone()));

    Orchestrator::new(config).with_interrupt(interrupt).run().await?;

    println!("All targets are up and responding.");
    Ok(())
}

/// Default level when `RUST_LOG` is unset
fn log_level(verbose: bool) -> LevelFilter {
    if verbose { LevelFilter::WARN } else { LevelFilter::ERROR }
}

fn banner(config: &RunConfig) -> String {
    let targets: Vec<String> = config.targets.iter().map(|t| format!("{t:?}")).collect();
    format!(
        "Waiting for targets: {} (timeout: {}, attempting every {})",
        targets.join(", "),
        humantime::format_duration(config.timeout),
        humantime::format_duration(config.interval),
    )
}

/// Cancel `token` on Ctrl-C or SIGTERM
async fn cancel_on_signal(token: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::pin!(terminate);

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(err) = result {
                warn!(error = %err, "failed to listen for Ctrl-C");
                (&mut terminate).await;
            }
        }
        _ = &mut terminate => {}
    }

    debug!("termination signal received");
    token.cancel();
}
