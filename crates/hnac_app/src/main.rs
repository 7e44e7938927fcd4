mod config;
mod logging;
mod runner;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use hnac_core::Settings;
use hnac_engine::ReportLog;
use hnac_logging::{hnac_info, hnac_warn};
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(name = "hnac", version, about = "Crawls Hacker News new stories into configured sinks")]
struct Cli {
    /// Settings file (RON). Defaults to ./hnac.ron when present.
    #[arg(long, global = true, env = "HNAC_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a single crawl job.
    Crawl,
    /// Run a crawl job periodically until interrupted.
    Schedule {
        /// Seconds between job starts.
        #[arg(long, default_value_t = 3600, value_parser = clap::value_parser!(u64).range(1..))]
        every: u64,
    },
    /// Show the most recent job reports.
    Reports {
        #[arg(long, default_value_t = 10)]
        count: usize,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let loaded = config::load(cli.config.as_deref())?;
    logging::initialize(&loaded.settings.logging);
    match &loaded.origin {
        Some(path) => hnac_info!("Loaded settings from {:?}", path),
        None => hnac_info!("No settings file found, using defaults"),
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting the async runtime")?;
    runtime.block_on(run(cli.command, loaded.settings))
}

async fn run(command: Command, settings: Settings) -> anyhow::Result<ExitCode> {
    match command {
        Command::Crawl => {
            let report = runner::crawl_once(&settings, cancel_on_ctrl_c()).await?;
            Ok(exit_code(report.failed()))
        }
        Command::Schedule { every } => {
            let summary =
                runner::schedule(&settings, Duration::from_secs(every), cancel_on_ctrl_c())
                    .await?;
            Ok(exit_code(summary.failed_runs > 0))
        }
        Command::Reports { count } => {
            let log = ReportLog::new(&settings.reports.path);
            let reports = log
                .latest(count)
                .with_context(|| format!("reading reports from {}", log.path().display()))?;
            print!("{}", runner::format_reports(&reports));
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn exit_code(failed: bool) -> ExitCode {
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// First Ctrl-C cancels the running job and lets it clean up; a second one exits.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        hnac_warn!("Interrupt received, stopping after cleanup");
        trigger.cancel();
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });
    token
}
