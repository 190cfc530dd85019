//! Full and partial build runs.
//!
//! ```text
//! acquire guard ─► before_bundling ─► global pre ─► join dirty bundles
//!                                                       │
//!   release ◄─ after_bundling ◄─ store mapping ◄─ global post
//! ```
//!
//! One bundle failing does not stop the batch. Cancellation stops it at the
//! next bundle (or composite child) boundary; bundles finished before that
//! stay published.

use std::sync::Arc;

use parking_lot::Mutex;
use rayon::prelude::*;

use super::dirty::{DirtyTracker, mark_dirty};
use super::guard::{BuildGuard, GuardPolicy};
use crate::bundle::{Bundle, BundleSet, BundleState};
use crate::core::{BuildContext, BundlingError, CancelToken, Result};
use crate::engine::BundlingEngine;
use crate::freshness::mtime::last_modified;
use crate::postprocess::{GlobalContext, GlobalProcessor};
use crate::store::BundleMapping;
use crate::utils::plural_count;
use crate::{debug, log};

/// Summary of one build run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub built: Vec<String>,
    /// Bundle id and error message.
    pub failed: Vec<(String, String)>,
    /// Bundles served from a production URL.
    pub skipped: Vec<String>,
    /// Bundles restored from the stored mapping without rebuilding.
    pub restored: usize,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

enum Outcome {
    Built,
    Skipped,
    Failed(String),
    Interrupted,
}

/// Owns the bundle set at runtime and serializes builds over it.
pub struct RebuildCoordinator {
    engine: BundlingEngine,
    bundles: Arc<BundleSet>,
    tracker: DirtyTracker,
    guard: BuildGuard,
    policy: GuardPolicy,
    global: Vec<Arc<dyn GlobalProcessor>>,
    /// Token of the current (or next) run.
    run: Mutex<CancelToken>,
    shutdown: CancelToken,
    config_hash: String,
    parallel: bool,
}

impl RebuildCoordinator {
    pub fn new(engine: BundlingEngine, bundles: Arc<BundleSet>, config_hash: impl Into<String>) -> Self {
        Self {
            engine,
            bundles,
            tracker: DirtyTracker::new(),
            guard: BuildGuard::new(),
            policy: GuardPolicy::Block,
            global: Vec::new(),
            run: Mutex::new(CancelToken::new()),
            shutdown: CancelToken::new(),
            config_hash: config_hash.into(),
            parallel: false,
        }
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    #[allow(dead_code)]
    pub fn with_policy(mut self, policy: GuardPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_shutdown(mut self, shutdown: CancelToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn with_global_processor(mut self, processor: Arc<dyn GlobalProcessor>) -> Self {
        self.global.push(processor);
        self
    }

    pub fn bundles(&self) -> &Arc<BundleSet> {
        &self.bundles
    }

    pub fn engine(&self) -> &BundlingEngine {
        &self.engine
    }

    /// Cancel the running build, if any.
    #[allow(dead_code)]
    pub fn interrupt(&self) {
        self.run.lock().cancel();
    }

    /// Block until no build is running.
    #[allow(dead_code)]
    pub fn wait_idle(&self) {
        self.guard.wait_idle();
    }

    /// Forward changed paths to the dirty tracker.
    pub fn on_paths_changed(&self, paths: &[std::path::PathBuf]) -> Vec<String> {
        self.tracker.on_paths_changed(&self.bundles, paths)
    }

    /// Ids of dirty bundles.
    pub fn dirty_bundles(&self) -> Vec<String> {
        self.bundles
            .iter()
            .filter(|b| b.is_dirty())
            .map(|b| b.id.clone())
            .collect()
    }

    // ------------------------------------------------------------------------
    // Entry points
    // ------------------------------------------------------------------------

    /// Startup build.
    ///
    /// When a mapping from an earlier run exists and the configuration is
    /// unchanged, states are restored and only bundles with a changed input
    /// (or missing content) are rebuilt. Otherwise everything is built.
    pub fn init(&self, use_mapping: bool) -> Result<BuildReport> {
        let restored = if use_mapping { self.restore_mapping() } else { None };
        match restored {
            Some(restored) => {
                let mut report = self.rebuild_dirty()?;
                report.restored = restored;
                Ok(report)
            }
            None => self.build_all(),
        }
    }

    /// Rebuild every bundle.
    pub fn build_all(&self) -> Result<BuildReport> {
        for bundle in self.bundles.iter() {
            bundle.mark_dirty();
        }
        self.run_batch(true)
    }

    /// Rebuild dirty bundles only.
    pub fn rebuild_dirty(&self) -> Result<BuildReport> {
        self.run_batch(false)
    }

    // ------------------------------------------------------------------------
    // Mapping reuse
    // ------------------------------------------------------------------------

    /// Restore bundle states from the stored mapping. Returns the number of
    /// bundles that need no rebuild, or `None` if the mapping is unusable.
    fn restore_mapping(&self) -> Option<usize> {
        let store = self.engine.store();
        if !store.mapping_exists() {
            return None;
        }
        let mapping = match store.get_mapping() {
            Ok(Some(mapping)) => mapping,
            Ok(None) => return None,
            Err(e) => {
                log!("warn"; "ignoring bundle mapping: {}", e);
                return None;
            }
        };
        if mapping.config_hash != self.config_hash {
            log!("build"; "configuration changed, rebuilding everything");
            return None;
        }

        let mut stale = Vec::new();
        for bundle in self.bundles.iter() {
            let Some(state) = mapping.bundles.get(&bundle.id) else {
                stale.push(bundle.id.clone());
                continue;
            };
            bundle.publish(state.clone());
            if is_fresh(state) && self.engine.has_stored_content(bundle) {
                bundle.mark_clean();
            } else {
                stale.push(bundle.id.clone());
            }
        }
        // Only after every fresh bundle is clean, so composites of stale
        // bundles end up dirty
        for id in &stale {
            mark_dirty(&self.bundles, id);
        }
        self.tracker.refresh(&self.bundles);

        let restored = self.bundles.iter().filter(|b| !b.is_dirty()).count();
        log!("build"; "restored {} from mapping", plural_count(restored, "bundle"));
        Some(restored)
    }

    // ------------------------------------------------------------------------
    // Batch
    // ------------------------------------------------------------------------

    fn run_batch(&self, full: bool) -> Result<BuildReport> {
        let _permit = self.guard.acquire(self.policy)?;
        let run = CancelToken::new();
        *self.run.lock() = run.clone();
        let ctx = BuildContext::new(run, self.shutdown.clone());

        let registries = self.engine.registries();
        registries.before_bundling();
        let result = self.run_locked(full, &ctx);
        registries.after_bundling();

        if let Err(e) = self.store_mapping() {
            log!("warn"; "cannot store bundle mapping: {}", e);
        }
        result
    }

    fn dirty_in_order(&self) -> Vec<Arc<Bundle>> {
        self.bundles
            .build_order()
            .into_iter()
            .filter(|b| b.is_dirty())
            .collect()
    }

    fn global_context<'a>(&'a self, batch: &'a [Arc<Bundle>], full: bool) -> GlobalContext<'a> {
        GlobalContext {
            bundles: &self.bundles,
            batch,
            mode: self.engine.mode(),
            full_build: full,
        }
    }

    fn run_locked(&self, full: bool, ctx: &BuildContext) -> Result<BuildReport> {
        // Global pre-processing may add bundles to the batch
        let batch = self.dirty_in_order();
        for processor in &self.global {
            let extra = processor.pre_process(&self.global_context(&batch, full))?;
            for id in extra {
                mark_dirty(&self.bundles, &id);
            }
        }
        let batch = self.dirty_in_order();

        let mut report = BuildReport::default();
        if batch.is_empty() {
            return Ok(report);
        }
        log!("build"; "bundling {}", plural_count(batch.len(), "bundle"));

        let (simple, composite): (Vec<_>, Vec<_>) =
            batch.iter().cloned().partition(|b| !b.is_composite());

        let mut outcomes: Vec<(Arc<Bundle>, Outcome)> = if self.parallel {
            simple
                .into_par_iter()
                .map(|b| {
                    let outcome = self.build_one(&b, ctx);
                    (b, outcome)
                })
                .collect()
        } else {
            let mut outcomes = Vec::with_capacity(simple.len());
            for b in simple {
                let outcome = self.build_one(&b, ctx);
                let stop = matches!(outcome, Outcome::Interrupted);
                outcomes.push((b, outcome));
                if stop {
                    break;
                }
            }
            outcomes
        };

        // Composites depend on their children, so they go in order
        if !outcomes.iter().any(|(_, o)| matches!(o, Outcome::Interrupted)) {
            for b in composite {
                let outcome = self.build_one(&b, ctx);
                let stop = matches!(outcome, Outcome::Interrupted);
                outcomes.push((b, outcome));
                if stop {
                    break;
                }
            }
        }

        let mut interrupted = false;
        for (bundle, outcome) in outcomes {
            match outcome {
                Outcome::Built => report.built.push(bundle.id.clone()),
                Outcome::Skipped => report.skipped.push(bundle.id.clone()),
                Outcome::Failed(message) => report.failed.push((bundle.id.clone(), message)),
                Outcome::Interrupted => interrupted = true,
            }
        }
        if interrupted {
            log!("build"; "interrupted after {}", plural_count(report.built.len(), "bundle"));
            return Err(BundlingError::Interrupted);
        }

        for processor in &self.global {
            if let Err(e) = processor.post_process(&self.global_context(&batch, full)) {
                log!("error"; "global processor `{}` failed: {}", processor.name(), e);
            }
        }
        Ok(report)
    }

    fn build_one(&self, bundle: &Bundle, ctx: &BuildContext) -> Outcome {
        if ctx.is_interrupted() {
            return Outcome::Interrupted;
        }
        if let Some(url) = &bundle.production_url {
            debug!("build"; "skipping `{}`, served from {}", bundle.id, url);
            bundle.mark_clean();
            return Outcome::Skipped;
        }

        // Cleared before joining: a change reported while the join runs
        // re-dirties the bundle and survives this build.
        bundle.mark_clean();
        match self.engine.build_bundle(&self.bundles, bundle, ctx) {
            Ok(()) => {
                self.tracker.refresh_bundle(&self.bundles, &bundle.id);
                Outcome::Built
            }
            Err(e) if e.is_interrupted() => {
                bundle.mark_dirty();
                Outcome::Interrupted
            }
            Err(e) => {
                bundle.mark_dirty();
                let e = e.in_bundle(&bundle.id);
                let message = error_chain(&e);
                log!("error"; "{}", message);
                Outcome::Failed(message)
            }
        }
    }

    fn store_mapping(&self) -> Result<()> {
        let mapping = BundleMapping {
            config_hash: self.config_hash.clone(),
            bundles: self
                .bundles
                .iter()
                .filter(|b| b.production_url.is_none())
                .map(|b| (b.id.clone(), BundleState::clone(&b.state())))
                .collect(),
        };
        self.engine.store().store_mapping(&mapping)
    }
}

/// Whether every recorded input still has its recorded timestamp.
///
/// Missing inputs are recorded as 0, so they stay fresh while missing.
fn is_fresh(state: &BundleState) -> bool {
    state
        .linked
        .iter()
        .all(|(path, &mtime)| last_modified(path).unwrap_or(0) == mtime)
}

/// Render an error with its sources, `outer: inner: root`.
pub fn error_chain(e: &dyn std::error::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
