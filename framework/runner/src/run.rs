use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use anyhow::Context;
use onoff_core::prelude::ShutdownHandle;
use onoff_instruments::{aggregate, AggregateStats, WorkerStats};

use crate::config::{ConfigurationError, Phase, RunConfig};
use crate::executor::Executor;
use crate::issuer::RequestIssuer;
use crate::monitor::start_monitor;
use crate::phase::{PhaseRunner, WorkerError};
use crate::progress::start_progress;
use crate::shutdown::start_shutdown_listener;
use crate::variate::{Rate, VariateSource};

/// The results of a run in which every worker finished cleanly.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Per-worker counters, in worker order.
    pub workers: Vec<WorkerStats>,
    pub aggregate: AggregateStats,
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("{}", describe_failures(.0))]
    WorkersFailed(Vec<WorkerError>),
    #[error("worker {0} panicked")]
    WorkerPanicked(String),
    #[error(transparent)]
    Setup(#[from] anyhow::Error),
}

impl RunError {
    /// The workers that stopped because of a transport error.
    pub fn worker_failures(&self) -> &[WorkerError] {
        match self {
            RunError::WorkersFailed(failures) => failures,
            _ => &[],
        }
    }
}

fn describe_failures(failures: &[WorkerError]) -> String {
    let details = failures
        .iter()
        .map(|failure| {
            format!(
                "{failure}: {} ({})",
                failure.source,
                error_cause(&failure.source)
            )
        })
        .collect::<Vec<_>>()
        .join("; ");

    format!("{} worker(s) failed: {details}", failures.len())
}

fn error_cause(err: &dyn std::error::Error) -> String {
    match err.source() {
        Some(source) => source.to_string(),
        None => "no further detail".to_string(),
    }
}

/// Run `config.worker_count` ON/OFF workers against the target until the configured duration has
/// elapsed.
///
/// `new_issuer` is called once per worker, with the worker index, before any worker starts.
///
/// If any worker fails, the remaining workers are shut down, every worker is waited for, and the
/// failures are returned instead of statistics.
pub fn run<I, F>(config: &RunConfig, mut new_issuer: F) -> Result<RunOutcome, RunError>
where
    I: RequestIssuer,
    F: FnMut(&RunConfig, usize) -> anyhow::Result<I>,
{
    config.validate()?;
    let on_rate = Rate::new(Phase::On, config.on_rate)?;
    let off_rate = Rate::new(Phase::Off, config.off_rate)?;

    log::info!(
        "Starting run {} against {} with {} worker(s) for {:?}",
        config.run_id,
        config.target_url,
        config.worker_count,
        config.duration
    );
    log::info!(
        "Expected ON fraction per worker: {:.3}",
        config.expected_duty_cycle()
    );

    let issuers = (0..config.worker_count)
        .map(|index| {
            new_issuer(config, index)
                .with_context(|| format!("Failed to create request issuer for agent-{index}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    let shutdown_handle = ShutdownHandle::default();
    start_shutdown_listener(&runtime, shutdown_handle.clone());
    let executor = Arc::new(Executor::new(runtime, shutdown_handle.clone()));

    let started = Instant::now();

    if config.duration.is_zero() {
        // Must be visible before the first worker checks for it.
        shutdown_handle.shutdown();
    } else {
        if !config.no_progress {
            start_progress(config.duration, shutdown_handle.new_listener());
        }

        // Set a timer to shut down the run after the duration has elapsed
        let deadline_handle = shutdown_handle.clone();
        let duration = config.duration;
        executor.spawn(async move {
            tokio::time::sleep(duration).await;
            log::info!("Run duration of {:?} elapsed", duration);
            deadline_handle.shutdown();
        });
    }

    start_monitor(shutdown_handle.new_listener());

    let mut handles: Vec<(String, JoinHandle<Result<WorkerStats, WorkerError>>)> =
        Vec::with_capacity(config.worker_count);
    let mut spawn_error = None;
    for (index, issuer) in issuers.into_iter().enumerate() {
        let agent_id = format!("agent-{index}");

        let runner = PhaseRunner::new(
            agent_id.clone(),
            on_rate,
            off_rate,
            VariateSource::for_worker(config.seed, index, config.time_unit),
            issuer,
            executor.clone(),
            shutdown_handle.new_listener(),
        );
        let fail_fast_handle = shutdown_handle.clone();

        let spawned = std::thread::Builder::new()
            .name(agent_id.clone())
            .spawn(move || {
                let result = runner.run();
                if let Err(e) = &result {
                    log::error!("Worker failed, stopping the run: {e}: {}", e.source);
                    fail_fast_handle.shutdown();
                }
                result
            });

        match spawned {
            Ok(handle) => handles.push((agent_id, handle)),
            Err(e) => {
                shutdown_handle.shutdown();
                spawn_error = Some(
                    anyhow::Error::new(e).context(format!("Failed to spawn thread for {agent_id}")),
                );
                break;
            }
        }
    }

    let mut workers = Vec::with_capacity(handles.len());
    let mut failures = Vec::new();
    let mut panicked = None;
    for (agent_id, handle) in handles {
        match handle.join() {
            Ok(Ok(stats)) => workers.push(stats),
            Ok(Err(e)) => failures.push(e),
            Err(_) => {
                log::error!("Worker {agent_id} panicked, stopping the run");
                shutdown_handle.shutdown();
                panicked.get_or_insert(agent_id);
            }
        }
    }

    let elapsed = started.elapsed();
    // Stops the progress and monitor threads if nothing else has.
    shutdown_handle.shutdown();

    if let Some(e) = spawn_error {
        return Err(RunError::Setup(e));
    }
    if !failures.is_empty() {
        return Err(RunError::WorkersFailed(failures));
    }
    if let Some(agent_id) = panicked {
        return Err(RunError::WorkerPanicked(agent_id));
    }

    let aggregate = aggregate(&workers, elapsed);
    log::info!(
        "Run {} finished after {:?} with {} request(s)",
        config.run_id,
        elapsed,
        aggregate.request_count
    );

    Ok(RunOutcome { workers, aggregate })
}
