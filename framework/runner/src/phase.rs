use std::sync::Arc;
use std::time::{Duration, Instant};

use onoff_core::prelude::DelegatedShutdownListener;
use onoff_instruments::WorkerStats;

use crate::executor::Executor;
use crate::issuer::{RequestIssuer, TransportError};
use crate::variate::{Rate, VariateSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseState {
    On,
    Off,
    Done,
}

/// A worker stopped because a request failed.
#[derive(Debug, thiserror::Error)]
#[error("{agent_id} failed after {} successful request(s)", .stats.request_count)]
pub struct WorkerError {
    pub agent_id: String,
    /// The counters as they were when the worker stopped.
    pub stats: WorkerStats,
    #[source]
    pub source: TransportError,
}

/// Drives one worker through alternating ON and OFF phases until the run is shut down.
pub struct PhaseRunner<I> {
    state: PhaseState,
    stats: WorkerStats,
    on_rate: Rate,
    off_rate: Rate,
    variates: VariateSource,
    issuer: I,
    executor: Arc<Executor>,
    shutdown_listener: DelegatedShutdownListener,
}

impl<I: RequestIssuer> PhaseRunner<I> {
    pub fn new(
        agent_id: String,
        on_rate: Rate,
        off_rate: Rate,
        variates: VariateSource,
        issuer: I,
        executor: Arc<Executor>,
        shutdown_listener: DelegatedShutdownListener,
    ) -> Self {
        Self {
            state: PhaseState::On,
            stats: WorkerStats::new(agent_id),
            on_rate,
            off_rate,
            variates,
            issuer,
            executor,
            shutdown_listener,
        }
    }

    pub fn state(&self) -> PhaseState {
        self.state
    }

    pub fn stats(&self) -> &WorkerStats {
        &self.stats
    }

    /// Step until the run is shut down, returning the final counters.
    pub fn run(mut self) -> Result<WorkerStats, WorkerError> {
        log::debug!("Starting {}", self.stats.agent_id);

        while self.state != PhaseState::Done {
            self.step()?;
        }

        log::debug!("Stopping {}", self.stats.agent_id);
        Ok(self.stats)
    }

    /// Complete the current phase and move to the next one.
    pub fn step(&mut self) -> Result<PhaseState, WorkerError> {
        self.state = match self.state {
            PhaseState::On => self.run_burst()?,
            PhaseState::Off => self.run_idle(),
            PhaseState::Done => PhaseState::Done,
        };

        Ok(self.state)
    }

    fn run_burst(&mut self) -> Result<PhaseState, WorkerError> {
        // A shutdown between bursts must not start, or count, another burst.
        if self.shutdown_listener.should_shutdown() {
            return Ok(PhaseState::Done);
        }

        let on_time = self.variates.draw(&self.on_rate);
        // A deadline beyond what `Instant` can represent only ends on shutdown.
        let deadline = Instant::now().checked_add(on_time);
        let before = self.stats.request_count;

        let mut cancelled = false;
        while deadline.map_or(true, |deadline| Instant::now() < deadline) {
            if self.shutdown_listener.should_shutdown() {
                cancelled = true;
                break;
            }

            match self.executor.execute_in_place(self.issuer.issue()) {
                Ok(Ok(elapsed)) => self.stats.record_request(elapsed),
                Ok(Err(source)) => {
                    log::debug!("Request failed for {}: {:?}", self.stats.agent_id, source);
                    return Err(WorkerError {
                        agent_id: self.stats.agent_id.clone(),
                        stats: self.stats.clone(),
                        source,
                    });
                }
                Err(_) => {
                    cancelled = true;
                    break;
                }
            }
        }

        self.stats.add_on_time(on_time);
        log::trace!(
            "{} burst of {:?} issued {} request(s)",
            self.stats.agent_id,
            on_time,
            self.stats.request_count - before
        );

        Ok(if cancelled {
            PhaseState::Done
        } else {
            PhaseState::Off
        })
    }

    fn run_idle(&mut self) -> PhaseState {
        let off_time = self.variates.draw(&self.off_rate);
        self.stats.add_off_time(off_time);

        match self.executor.execute_in_place(idle(off_time)) {
            Ok(()) => PhaseState::On,
            Err(_) => PhaseState::Done,
        }
    }
}

async fn idle(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}
