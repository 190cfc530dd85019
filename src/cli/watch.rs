//! `sheaf watch`: build, then rebuild on change until Ctrl+C.

use std::time::Instant;

use anyhow::{Context, Result};

use super::Runtime;
use super::build::log_report;
use crate::config::SheafConfig;
use crate::core::CancelToken;
use crate::log;
use crate::watch::FsWatcher;

pub fn watch(config: &SheafConfig, shutdown: CancelToken) -> Result<()> {
    if !config.watch.enabled {
        log!("watch"; "watching is disabled in the configuration, building once");
        return super::build::build(config, shutdown);
    }
    let runtime = Runtime::new(config, shutdown.clone())?;

    // Start watching first so edits during the initial build are not lost
    let mut roots = vec![config.build.root.clone()];
    roots.extend(config.generator.classpath.iter().cloned());
    let watcher = FsWatcher::start(roots, &config.watch).context("starting the file watcher")?;

    let started = Instant::now();
    match runtime.init() {
        Ok(report) => log_report(&report, started),
        Err(e) if shutdown.is_cancelled() => {
            log!("build"; "{}", e);
            return Ok(());
        }
        Err(e) => return Err(e),
    }

    watcher.run(&runtime.coordinator, &shutdown);
    Ok(())
}
