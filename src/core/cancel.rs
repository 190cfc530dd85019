//! Cooperative cancellation passed explicitly through the build call chain.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::BundlingError;

/// A shareable cancellation flag.
///
/// Cloning shares the flag. Cancellation is sticky: once set it stays set.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Check if cancellation has been requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Per-run build context.
///
/// Carries the run-scoped interrupt flag and the process-wide shutdown
/// flag. Checked at the start of every bundle iteration and every
/// composite-child iteration.
#[derive(Debug, Clone, Default)]
pub struct BuildContext {
    run: CancelToken,
    shutdown: CancelToken,
}

impl BuildContext {
    pub fn new(run: CancelToken, shutdown: CancelToken) -> Self {
        Self { run, shutdown }
    }

    /// Whether either the run or the whole process was cancelled.
    pub fn is_interrupted(&self) -> bool {
        self.run.is_cancelled() || self.shutdown.is_cancelled()
    }

    /// Bail out with [`BundlingError::Interrupted`] if cancelled.
    #[inline]
    pub fn check(&self) -> Result<(), BundlingError> {
        if self.is_interrupted() {
            return Err(BundlingError::Interrupted);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_context_checks_both_flags() {
        let run = CancelToken::new();
        let shutdown = CancelToken::new();
        let ctx = BuildContext::new(run.clone(), shutdown.clone());
        assert!(ctx.check().is_ok());

        shutdown.cancel();
        assert!(matches!(ctx.check(), Err(BundlingError::Interrupted)));

        let ctx = BuildContext::new(run.clone(), CancelToken::new());
        run.cancel();
        assert!(ctx.is_interrupted());
    }
}
