use anyhow::Context;
use tokio::signal;

use onoff_core::prelude::ShutdownHandle;

/// Shut the run down early when the user presses Ctrl-C. The results so far are still reported.
pub(crate) fn start_shutdown_listener(runtime: &tokio::runtime::Runtime, handle: ShutdownHandle) {
    runtime.spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                println!("Received shutdown signal, shutting down...");
                handle.shutdown();
            }
            Err(e) => {
                log::warn!("Failed to listen for the Ctrl-C signal: {e:?}");
            }
        }
    });
}

/// Block until the user presses Ctrl-C.
///
/// Used to keep the process, and its printed results, around after a run has finished. For example,
/// so that logs can be collected from a container before it is restarted.
pub fn linger() -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")?;

    println!("Run finished, waiting for Ctrl-C to exit");
    runtime
        .block_on(signal::ctrl_c())
        .context("Failed to listen for the Ctrl-C signal")
}
