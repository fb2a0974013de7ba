use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Counters for a single worker.
///
/// A record is owned by exactly one worker while the run is in progress. The counters can only
/// grow, so a record observed later in a run always dominates one observed earlier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStats {
    pub agent_id: String,
    /// Sum of the drawn ON durations, whether or not the burst ran to completion.
    pub on_time_nanos: u64,
    pub off_time_nanos: u64,
    /// Requests that completed without a transport error.
    pub request_count: u64,
    pub request_time_millis: u64,
}

impl WorkerStats {
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            ..Default::default()
        }
    }

    pub fn add_on_time(&mut self, on_time: Duration) {
        self.on_time_nanos = self.on_time_nanos.saturating_add(saturating_nanos(on_time));
    }

    pub fn add_off_time(&mut self, off_time: Duration) {
        self.off_time_nanos = self.off_time_nanos.saturating_add(saturating_nanos(off_time));
    }

    /// Count one successful request. The elapsed time is truncated to whole milliseconds.
    pub fn record_request(&mut self, elapsed: Duration) {
        self.request_count = self.request_count.saturating_add(1);
        self.request_time_millis = self
            .request_time_millis
            .saturating_add(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
    }

    /// True if every counter in `self` is at least the matching counter in `earlier`.
    pub fn dominates(&self, earlier: &WorkerStats) -> bool {
        self.on_time_nanos >= earlier.on_time_nanos
            && self.off_time_nanos >= earlier.off_time_nanos
            && self.request_count >= earlier.request_count
            && self.request_time_millis >= earlier.request_time_millis
    }
}

fn saturating_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

/// Raised when a derived metric would divide by zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum NoDataError {
    #[error("no data: no workers completed")]
    NoWorkers,
    #[error("no data: no requests were issued")]
    NoRequests,
    #[error("no data: no time elapsed")]
    NoElapsedTime,
}

/// Totals across every worker of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub worker_count: usize,
    pub on_time_nanos: u64,
    pub off_time_nanos: u64,
    pub request_count: u64,
    pub request_time_millis: u64,
    /// Wall clock time for the whole run, not the sum of per-worker times.
    pub elapsed: Duration,
}

impl AggregateStats {
    pub fn average_latency_millis(&self) -> Result<f64, NoDataError> {
        if self.request_count == 0 {
            return Err(NoDataError::NoRequests);
        }

        Ok(self.request_time_millis as f64 / self.request_count as f64)
    }

    /// Requests per second of elapsed wall clock time.
    pub fn throughput(&self) -> Result<f64, NoDataError> {
        if self.request_count == 0 {
            return Err(NoDataError::NoRequests);
        }
        if self.elapsed.is_zero() {
            return Err(NoDataError::NoElapsedTime);
        }

        Ok(self.request_count as f64 / self.elapsed.as_secs_f64())
    }

    pub fn average_on_time_per_worker(&self) -> Result<Duration, NoDataError> {
        self.per_worker(self.on_time_nanos)
    }

    pub fn average_off_time_per_worker(&self) -> Result<Duration, NoDataError> {
        self.per_worker(self.off_time_nanos)
    }

    fn per_worker(&self, total_nanos: u64) -> Result<Duration, NoDataError> {
        if self.worker_count == 0 {
            return Err(NoDataError::NoWorkers);
        }

        Ok(Duration::from_nanos(total_nanos / self.worker_count as u64))
    }
}

/// Sum the per-worker records of a completed run.
///
/// This is a pure function of its inputs, so it can be called any number of times on the same
/// records and produce the same result.
pub fn aggregate(records: &[WorkerStats], elapsed: Duration) -> AggregateStats {
    records.iter().fold(
        AggregateStats {
            worker_count: records.len(),
            elapsed,
            ..Default::default()
        },
        |mut acc, record| {
            acc.on_time_nanos = acc.on_time_nanos.saturating_add(record.on_time_nanos);
            acc.off_time_nanos = acc.off_time_nanos.saturating_add(record.off_time_nanos);
            acc.request_count = acc.request_count.saturating_add(record.request_count);
            acc.request_time_millis = acc
                .request_time_millis
                .saturating_add(record.request_time_millis);
            acc
        },
    )
}
