use std::fmt::Write as _;
use std::time::Duration;

use anyhow::Context;
use chrono::SecondsFormat;
use hnac_core::{JobReport, Settings};
use hnac_engine::{build_processor_group, HackernewsStories, Job, ReportLog};
use hnac_logging::{hnac_error, hnac_info};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Totals over a `schedule` session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleSummary {
    pub runs: u64,
    pub failed_runs: u64,
}

/// Builds a fresh source and processor group, runs one job and records its report.
///
/// Configuration problems are returned as errors; everything that happens
/// during the run is in the report.
pub async fn crawl_once(settings: &Settings, cancel: CancellationToken) -> anyhow::Result<JobReport> {
    let source =
        HackernewsStories::from_settings(settings).context("building the story source")?;
    let processors = build_processor_group(settings).context("configuring processors")?;
    hnac_info!("Dispatching to processors {:?}", processors.names());

    let report = Job::new(Box::new(source), processors)
        .with_cancellation(cancel)
        .run()
        .await;

    let log = ReportLog::new(&settings.reports.path);
    if let Err(err) = log.append(&report) {
        hnac_error!("Could not record report in {:?}: {}", log.path(), err);
    }
    Ok(report)
}

/// Runs one job per tick of `every` until `cancel` fires. Jobs never overlap.
pub async fn schedule(
    settings: &Settings,
    every: Duration,
    cancel: CancellationToken,
) -> anyhow::Result<ScheduleSummary> {
    let mut ticks = interval(every);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut summary = ScheduleSummary::default();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticks.tick() => {}
        }

        let report = crawl_once(settings, cancel.clone()).await?;
        summary.runs += 1;
        if report.failed() {
            summary.failed_runs += 1;
        }
        if cancel.is_cancelled() {
            break;
        }
        hnac_info!("Next crawl in {}s", every.as_secs_f64());
    }

    hnac_info!(
        "Schedule stopped after {} runs ({} failed)",
        summary.runs,
        summary.failed_runs
    );
    Ok(summary)
}

pub fn format_reports(reports: &[JobReport]) -> String {
    if reports.is_empty() {
        return "No job reports recorded yet.\n".to_string();
    }

    let mut out = format!(
        "{:<32}  {:<20}  {:>9}  {:>6}  {}\n",
        "JOB", "STARTED", "ELAPSED", "ITEMS", "STATUS"
    );
    for report in reports {
        let elapsed = report.elapsed().num_milliseconds() as f64 / 1000.0;
        let _ = writeln!(
            out,
            "{:<32}  {:<20}  {:>8.1}s  {:>6}  {}",
            report.job_id().to_string(),
            report.start_time().to_rfc3339_opts(SecondsFormat::Secs, true),
            elapsed,
            report.processed_item_count(),
            if report.failed() { "failed" } else { "ok" }
        );
    }
    out
}
