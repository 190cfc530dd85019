//! `sheaf build`: build every stale bundle once.

use std::time::Instant;

use anyhow::{Result, bail};

use super::Runtime;
use crate::config::SheafConfig;
use crate::core::CancelToken;
use crate::log;
use crate::rebuild::BuildReport;
use crate::utils::plural_count;

pub fn build(config: &SheafConfig, shutdown: CancelToken) -> Result<()> {
    let started = Instant::now();
    let runtime = Runtime::new(config, shutdown)?;
    let report = runtime.init()?;
    log_report(&report, started);

    let engine = runtime.coordinator.engine();
    let live = engine.live_bundles(runtime.coordinator.bundles());
    if !live.is_empty() {
        log!("build"; "resolved per request: {}", live.join(", "));
    }
    if config.build.dry_run {
        log!("build"; "dry run, nothing written");
    }

    if !report.is_success() {
        bail!("{} failed", plural_count(report.failed.len(), "bundle"));
    }
    Ok(())
}

/// Summarize a build run.
pub fn log_report(report: &BuildReport, started: Instant) {
    let mut parts = vec![format!("built {}", plural_count(report.built.len(), "bundle"))];
    if report.restored > 0 {
        parts.push(format!("{} up to date", report.restored));
    }
    if !report.skipped.is_empty() {
        parts.push(format!("{} served externally", report.skipped.len()));
    }
    if !report.failed.is_empty() {
        parts.push(format!("{} failed", report.failed.len()));
    }
    log!("build"; "{} in {:.0?}", parts.join(", "), started.elapsed());
}
