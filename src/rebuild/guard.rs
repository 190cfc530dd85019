//! Single-writer guard for build runs.

use parking_lot::{Condvar, Mutex};

use crate::core::{BundlingError, Result};

/// What to do when a build is already running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardPolicy {
    /// Wait for the running build to finish.
    Block,
    /// Fail with [`BundlingError::Busy`].
    #[allow(dead_code)]
    Reject,
}

/// Allows at most one build at a time.
#[derive(Debug, Default)]
pub struct BuildGuard {
    running: Mutex<bool>,
    released: Condvar,
}

impl BuildGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter the guard. The returned permit releases it on drop.
    pub fn acquire(&self, policy: GuardPolicy) -> Result<BuildPermit<'_>> {
        let mut running = self.running.lock();
        while *running {
            match policy {
                GuardPolicy::Reject => return Err(BundlingError::Busy),
                GuardPolicy::Block => self.released.wait(&mut running),
            }
        }
        *running = true;
        Ok(BuildPermit { guard: self })
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        *self.running.lock()
    }

    /// Block until no build is running.
    pub fn wait_idle(&self) {
        let mut running = self.running.lock();
        while *running {
            self.released.wait(&mut running);
        }
    }

    fn release(&self) {
        *self.running.lock() = false;
        self.released.notify_all();
    }
}

/// Proof of holding the [`BuildGuard`].
#[derive(Debug)]
pub struct BuildPermit<'a> {
    guard: &'a BuildGuard,
}

impl Drop for BuildPermit<'_> {
    fn drop(&mut self) {
        self.guard.release();
    }
}
