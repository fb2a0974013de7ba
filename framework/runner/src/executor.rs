use std::future::Future;

use onoff_core::prelude::{ShutdownHandle, ShutdownSignalError};

/// Runs the async parts of a worker on the shared Tokio runtime.
#[derive(Debug)]
pub struct Executor {
    runtime: tokio::runtime::Runtime,
    shutdown_handle: ShutdownHandle,
}

impl Executor {
    pub(crate) fn new(runtime: tokio::runtime::Runtime, shutdown_handle: ShutdownHandle) -> Self {
        Self {
            runtime,
            shutdown_handle,
        }
    }

    /// Run async code in place, blocking until it completes.
    ///
    /// The future is raced against the shutdown signal and dropped as soon as the signal fires, in
    /// which case [ShutdownSignalError] is returned. If the signal has already fired, the future is
    /// not polled at all.
    pub fn execute_in_place<T>(
        &self,
        fut: impl Future<Output = T>,
    ) -> Result<T, ShutdownSignalError> {
        let mut shutdown_listener = self.shutdown_handle.new_listener();
        self.runtime.block_on(async move {
            tokio::select! {
                biased;
                _ = shutdown_listener.wait_for_shutdown() => Err(ShutdownSignalError::default()),
                result = fut => Ok(result),
            }
        })
    }

    /// Submit async code to be run in the background.
    ///
    /// Note that the future will not be cancelled if the run is shut down, and the run does not
    /// wait for it to complete.
    pub fn spawn(&self, fut: impl Future<Output = ()> + Send + 'static) {
        self.runtime.spawn(fut);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn executor() -> (Executor, ShutdownHandle) {
        let handle = ShutdownHandle::new();
        let runtime = tokio::runtime::Runtime::new().unwrap();
        (Executor::new(runtime, handle.clone()), handle)
    }

    #[test]
    fn completes_without_shutdown() {
        let (executor, _handle) = executor();
        assert_eq!(5, executor.execute_in_place(async { 5 }).unwrap());
    }

    #[test]
    fn does_not_poll_after_shutdown() {
        let (executor, handle) = executor();
        handle.shutdown();

        let mut polled = false;
        let result = executor.execute_in_place(async { polled = true });

        assert!(result.is_err());
        assert!(!polled);
    }

    #[test]
    fn shutdown_interrupts_sleep() {
        let (executor, handle) = executor();

        let trigger = handle.clone();
        executor.spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.shutdown();
        });

        let started = Instant::now();
        let result = executor.execute_in_place(async { tokio::time::sleep(Duration::from_secs(60)).await });

        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
