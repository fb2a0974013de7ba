use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::RunConfig;

/// Super-imposes independent Markov ON/OFF traffic sources against one HTTP endpoint.
///
/// Every option can also be set from the environment variable named next to it.
#[derive(Parser, Debug, Clone)]
#[command(about, long_about = None)]
pub struct OnOffCli {
    /// Target URL for requests
    #[clap(long, env = "ONOFF_URL", default_value = "http://localhost:80/admin/test")]
    pub url: String,

    /// The number of workers to run in parallel
    #[clap(long, visible_alias = "threads", env = "ONOFF_WORKERS", default_value_t = 1)]
    pub workers: usize,

    /// Rate parameter of the exponentially distributed ON phase
    #[clap(long, env = "ONOFF_ON", default_value_t = 0.3)]
    pub on: f64,

    /// Rate parameter of the exponentially distributed OFF phase
    #[clap(long, env = "ONOFF_OFF", default_value_t = 0.8)]
    pub off: f64,

    /// The number of seconds to run for
    #[clap(long, env = "ONOFF_DURATION", default_value_t = 30)]
    pub duration: u64,

    /// The number of seconds to wait for a single request, including its response body
    #[clap(long, env = "ONOFF_REQUEST_TIMEOUT", default_value_t = 120)]
    pub request_timeout: u64,

    /// Milliseconds represented by one unit of a drawn ON or OFF sample
    #[clap(long, env = "ONOFF_TIME_UNIT_MS", default_value_t = 10.0)]
    pub time_unit_ms: f64,

    /// Maximum idle keep-alive connections kept by each worker
    #[clap(long, env = "ONOFF_MAX_IDLE_CONNECTIONS", default_value_t = 100)]
    pub max_idle_connections: usize,

    /// Seed for the phase duration generators. Worker `i` uses `seed + i`.
    ///
    /// Without a seed, every run draws different phase durations.
    #[clap(long, env = "ONOFF_SEED")]
    pub seed: Option<u64>,

    /// A unique id for this run. Generated if not set.
    #[clap(long, env = "ONOFF_RUN_ID")]
    pub run_id: Option<String>,

    /// Append a JSON summary of the run to this file, one line per run.
    #[clap(long, env = "ONOFF_SUMMARY_FILE")]
    pub summary_file: Option<PathBuf>,

    /// Do not show a progress bar on the CLI.
    ///
    /// This is recommended for CI/CD environments where the progress bar isn't being looked at by anyone and is just adding noise to the logs.
    #[clap(long, env = "ONOFF_NO_PROGRESS", default_value = "false")]
    pub no_progress: bool,

    /// After a successful run, keep the process alive until Ctrl-C is pressed.
    #[clap(long, env = "ONOFF_LINGER", default_value = "false")]
    pub linger: bool,
}

impl OnOffCli {
    /// The run configuration described by these options. It has not been validated yet.
    pub fn to_config(&self) -> RunConfig {
        let defaults = RunConfig::default();

        RunConfig {
            run_id: self.run_id.clone().unwrap_or(defaults.run_id),
            target_url: self.url.clone(),
            worker_count: self.workers,
            on_rate: self.on,
            off_rate: self.off,
            duration: Duration::from_secs(self.duration),
            request_timeout: Duration::from_secs(self.request_timeout),
            time_unit: time_unit(self.time_unit_ms),
            max_idle_connections: self.max_idle_connections,
            seed: self.seed,
            no_progress: self.no_progress,
        }
    }
}

/// Anything that is not a positive number of milliseconds becomes zero and fails validation.
fn time_unit(millis: f64) -> Duration {
    if millis.is_finite() && millis > 0.0 {
        Duration::from_nanos((millis * 1_000_000.0) as u64)
    } else {
        Duration::ZERO
    }
}
