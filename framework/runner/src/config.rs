use std::time::Duration;

/// Which phase of the ON/OFF cycle a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum Phase {
    #[display("ON")]
    On,
    #[display("OFF")]
    Off,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("the {phase} rate must be a finite number greater than zero, got {value}")]
    InvalidRate { phase: Phase, value: f64 },
    #[error("at least one worker is required")]
    NoWorkers,
    #[error("the time unit must be greater than zero")]
    ZeroTimeUnit,
    #[error("invalid target URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Everything a run needs to know, fixed before the first worker starts.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub run_id: String,
    pub target_url: String,
    pub worker_count: usize,
    /// Rate parameter (lambda) of the exponential distribution of ON durations.
    pub on_rate: f64,
    /// Rate parameter (lambda) of the exponential distribution of OFF durations.
    pub off_rate: f64,
    pub duration: Duration,
    pub request_timeout: Duration,
    /// The duration of one unit of a raw exponential sample. Applied to ON and OFF draws alike.
    pub time_unit: Duration,
    /// Upper bound on idle keep-alive connections held by each worker's client.
    pub max_idle_connections: usize,
    /// When set, worker `i` seeds its generator with `seed + i`.
    pub seed: Option<u64>,
    pub no_progress: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            run_id: nanoid::nanoid!(),
            target_url: "http://localhost:80/admin/test".to_string(),
            worker_count: 1,
            on_rate: 0.3,
            off_rate: 0.8,
            duration: Duration::from_secs(30),
            request_timeout: Duration::from_secs(120),
            time_unit: Duration::from_millis(10),
            max_idle_connections: 100,
            seed: None,
            no_progress: false,
        }
    }
}

impl RunConfig {
    /// Check the configuration before anything is started.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        check_rate(Phase::On, self.on_rate)?;
        check_rate(Phase::Off, self.off_rate)?;

        if self.worker_count < 1 {
            return Err(ConfigurationError::NoWorkers);
        }

        if self.time_unit.is_zero() {
            return Err(ConfigurationError::ZeroTimeUnit);
        }

        let url = url::Url::parse(&self.target_url).map_err(|e| ConfigurationError::InvalidUrl {
            url: self.target_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigurationError::InvalidUrl {
                url: self.target_url.clone(),
                reason: format!("unsupported scheme {}", url.scheme()),
            });
        }

        Ok(())
    }

    /// The expected fraction of time a single worker spends in the ON phase.
    pub fn expected_duty_cycle(&self) -> f64 {
        let mean_on = 1.0 / self.on_rate;
        let mean_off = 1.0 / self.off_rate;

        mean_on / (mean_on + mean_off)
    }
}

pub(crate) fn check_rate(phase: Phase, value: f64) -> Result<(), ConfigurationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidRate { phase, value })
    }
}
