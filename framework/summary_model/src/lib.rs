use itertools::Itertools;
use onoff_instruments::AggregateStats;
use serde::{Deserialize, Serialize};
use sha3::Digest;
use std::collections::HashMap;
use std::io::{BufRead, Read, Write};
use std::path::Path;

/// Summary of a run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    /// The unique run id
    ///
    /// Chosen by the runner. Unique for each run.
    pub run_id: String,
    /// The name of the scenario binary that was run
    pub scenario_name: String,
    /// The URL that requests were sent to
    pub target_url: String,
    /// The time the run started
    ///
    /// This is a Unix timestamp in seconds.
    pub started_at: i64,
    /// The duration that the run was configured with, in seconds
    pub run_duration: u64,
    /// The number of workers configured
    pub worker_count: usize,
    /// The rate parameter of the exponential ON phase distribution
    pub on_rate: f64,
    /// The rate parameter of the exponential OFF phase distribution
    pub off_rate: f64,
    /// The duration, in nanoseconds, of one unit of a drawn variate
    pub time_unit_nanos: u64,
    /// Totals for the run
    ///
    /// Not set if any worker failed, there are no partial results.
    pub aggregate: Option<AggregateStats>,
    /// The ids of workers that failed with a transport error
    pub failed_workers: Vec<String>,
    /// Environment variables set for the run
    ///
    /// This won't capture all environment variables. Just the ones that configure the runner.
    pub env: HashMap<String, String>,
    /// The version of the load generator that was used for this run
    pub version: String,
}

impl RunSummary {
    /// Create a new run summary
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        run_id: String,
        scenario_name: String,
        target_url: String,
        started_at: i64,
        run_duration: u64,
        worker_count: usize,
        on_rate: f64,
        off_rate: f64,
        time_unit_nanos: u64,
        version: String,
    ) -> Self {
        Self {
            run_id,
            scenario_name,
            target_url,
            started_at,
            run_duration,
            worker_count,
            on_rate,
            off_rate,
            time_unit_nanos,
            aggregate: None,
            failed_workers: Vec::new(),
            env: HashMap::with_capacity(0),
            version,
        }
    }

    /// Record the totals of a successful run
    pub fn set_aggregate(&mut self, aggregate: AggregateStats) {
        self.aggregate = Some(aggregate);
    }

    /// Record a worker that failed
    pub fn add_failed_worker(&mut self, agent_id: String) {
        self.failed_workers.push(agent_id);
    }

    /// Add an environment variable
    pub fn add_env(&mut self, key: String, value: String) {
        self.env.insert(key, value);
    }

    /// Compute a fingerprint for this run summary
    ///
    /// The fingerprint is intended to uniquely identify the configuration used for the run, so
    /// that results of comparable runs can be grouped. It uses the
    ///     - Scenario name
    ///     - Target URL
    ///     - Run duration
    ///     - Worker count
    ///     - ON and OFF rates and the time unit
    ///     - Selected environment variables
    ///     - Version
    ///
    /// The fingerprint is computed using [sha3::Sha3_256].
    pub fn fingerprint(&self) -> String {
        let mut hasher = sha3::Sha3_256::new();
        Digest::update(&mut hasher, self.scenario_name.as_bytes());
        Digest::update(&mut hasher, self.target_url.as_bytes());
        Digest::update(&mut hasher, self.run_duration.to_le_bytes());
        Digest::update(&mut hasher, (self.worker_count as u64).to_le_bytes());
        Digest::update(&mut hasher, self.on_rate.to_le_bytes());
        Digest::update(&mut hasher, self.off_rate.to_le_bytes());
        Digest::update(&mut hasher, self.time_unit_nanos.to_le_bytes());
        self.env
            .iter()
            .sorted_by_key(|(k, _)| k.to_owned())
            .for_each(|(k, v)| {
                Digest::update(&mut hasher, k.as_bytes());
                Digest::update(&mut hasher, v.as_bytes());
            });
        Digest::update(&mut hasher, self.version.as_bytes());

        format!("{:x}", hasher.finalize())
    }
}

/// Append the run summary to a file
///
/// The summary will be serialized to JSON and output as a single line followed by a newline. The
/// recommended file extension is `.jsonl`.
pub fn append_run_summary(run_summary: &RunSummary, path: &Path) -> anyhow::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)?;
    store_run_summary(run_summary, &mut file)?;
    file.write_all(b"\n")?;
    Ok(())
}

/// Serialize the run summary to a writer
pub fn store_run_summary<W: Write>(run_summary: &RunSummary, writer: &mut W) -> anyhow::Result<()> {
    serde_json::to_writer(writer, run_summary)?;
    Ok(())
}

/// Load a run summary from a reader
pub fn load_run_summary<R: Read>(reader: R) -> anyhow::Result<RunSummary> {
    let reader = std::io::BufReader::new(reader);
    let run_summary: RunSummary = serde_json::from_reader(reader)?;
    Ok(run_summary)
}

/// Load run summaries from a file
///
/// The file should contain one JSON object per line. This is the format produced by
/// [append_run_summary].
pub fn load_summary_runs(path: &Path) -> anyhow::Result<Vec<RunSummary>> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    let mut runs = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let run: RunSummary = serde_json::from_str(&line)?;
        runs.push(run);
    }
    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn sample_summary(run_id: &str) -> RunSummary {
        RunSummary::new(
            run_id.to_string(),
            "http_on_off".to_string(),
            "http://localhost:8080/".to_string(),
            1_700_000_000,
            30,
            4,
            0.3,
            0.8,
            10_000_000,
            "0.1.0".to_string(),
        )
    }

    #[test]
    fn append_and_load_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.jsonl");

        let mut first = sample_summary("first");
        first.set_aggregate(AggregateStats {
            worker_count: 4,
            on_time_nanos: 10,
            off_time_nanos: 20,
            request_count: 30,
            request_time_millis: 40,
            elapsed: Duration::from_secs(30),
        });
        let mut second = sample_summary("second");
        second.add_failed_worker("agent-2".to_string());

        append_run_summary(&first, &path).unwrap();
        append_run_summary(&second, &path).unwrap();

        let runs = load_summary_runs(&path).unwrap();
        assert_eq!(vec![first, second], runs);
    }

    #[test]
    fn fingerprint_ignores_run_id_and_results() {
        let first = sample_summary("first");
        let mut second = sample_summary("second");
        second.add_failed_worker("agent-0".to_string());

        assert_eq!(first.fingerprint(), second.fingerprint());
    }

    #[test]
    fn fingerprint_changes_with_configuration() {
        let first = sample_summary("first");
        let mut second = sample_summary("second");
        second.on_rate = 1.0;

        assert_ne!(first.fingerprint(), second.fingerprint());

        let mut third = sample_summary("third");
        third.add_env("URL".to_string(), "http://other/".to_string());
        assert_ne!(first.fingerprint(), third.fingerprint());
    }

    #[test]
    fn store_then_load_single_summary() {
        let summary = sample_summary("single");
        let mut buf = Vec::new();
        store_run_summary(&summary, &mut buf).unwrap();

        let loaded = load_run_summary(buf.as_slice()).unwrap();
        assert_eq!(summary, loaded);
    }
}
