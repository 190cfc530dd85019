//! Rebuild coordination.
//!
//! - [`DirtyTracker`]: maps changed files to the bundles that read them
//! - [`BuildGuard`]: at most one build runs at a time
//! - [`RebuildCoordinator`]: full builds, partial rebuilds, mapping reuse

mod coordinator;
mod dirty;
mod guard;

pub use coordinator::{BuildReport, RebuildCoordinator, error_chain};
pub use dirty::{DirtyTracker, mark_dirty};
pub use guard::{BuildGuard, BuildPermit, GuardPolicy};
