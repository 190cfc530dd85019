//! Process-wide shutdown wiring.

use super::CancelToken;

/// Setup the global Ctrl+C handler. Call once at program start.
///
/// Sets the shared shutdown token so an in-flight build unwinds at its
/// next checkpoint, then runs `on_shutdown` (typically stopping the
/// watcher loop).
pub fn setup_shutdown_handler(
    shutdown: CancelToken,
    on_shutdown: impl Fn() + Send + 'static,
) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        if shutdown.is_cancelled() {
            // Second Ctrl+C: stop waiting for a clean unwind
            std::process::exit(130);
        }
        crate::log!("build"; "shutting down...");
        shutdown.cancel();
        on_shutdown();
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}
