use std::path::Path;

use chrono::{DateTime, Utc};
use onoff_summary_model::{append_run_summary, RunSummary};

use crate::config::RunConfig;
use crate::run::{RunError, RunOutcome};

/// Environment variables that configure a run are recorded with its summary.
const ENV_PREFIX: &str = "ONOFF_";

pub fn build_run_summary(
    scenario_name: &str,
    config: &RunConfig,
    started_at: DateTime<Utc>,
    result: &Result<RunOutcome, RunError>,
) -> RunSummary {
    let mut summary = RunSummary::new(
        config.run_id.clone(),
        scenario_name.to_string(),
        config.target_url.clone(),
        started_at.timestamp(),
        config.duration.as_secs(),
        config.worker_count,
        config.on_rate,
        config.off_rate,
        u64::try_from(config.time_unit.as_nanos()).unwrap_or(u64::MAX),
        env!("CARGO_PKG_VERSION").to_string(),
    );

    match result {
        Ok(outcome) => summary.set_aggregate(outcome.aggregate.clone()),
        Err(e) => {
            for failure in e.worker_failures() {
                summary.add_failed_worker(failure.agent_id.clone());
            }
        }
    }

    for (key, value) in std::env::vars().filter(|(key, _)| key.starts_with(ENV_PREFIX)) {
        summary.add_env(key, value);
    }

    summary
}

/// Append the summary of a finished run to `path`.
pub fn write_run_summary(
    path: &Path,
    scenario_name: &str,
    config: &RunConfig,
    started_at: DateTime<Utc>,
    result: &Result<RunOutcome, RunError>,
) -> anyhow::Result<()> {
    let summary = build_run_summary(scenario_name, config, started_at, result);
    log::info!(
        "Writing summary of run {} with fingerprint {} to {}",
        summary.run_id,
        summary.fingerprint(),
        path.display()
    );

    append_run_summary(&summary, path)
}
