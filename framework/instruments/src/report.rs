mod worker_table;

use std::fmt::Display;
use std::time::Duration;

use tabled::settings::Style;
use tabled::Table;

use crate::report::worker_table::WorkerRow;
use crate::{AggregateStats, NoDataError, WorkerStats};

/// The end of run report: aggregate summary lines followed by a per-worker table.
pub struct SummaryReport<'a> {
    aggregate: &'a AggregateStats,
    workers: &'a [WorkerStats],
}

impl<'a> SummaryReport<'a> {
    pub fn new(aggregate: &'a AggregateStats, workers: &'a [WorkerStats]) -> Self {
        Self { aggregate, workers }
    }

    pub fn print(&self) {
        println!("{}", format_summary(self.aggregate));

        if self.workers.is_empty() {
            return;
        }

        println!("\nSummary of workers");
        let rows = self.workers.iter().map(WorkerRow::from).collect::<Vec<_>>();
        let mut table = Table::new(rows);
        table.with(Style::modern());

        println!("{}", table);
    }
}

/// Render the aggregate as human readable lines. Metrics without a usable denominator are
/// rendered as the no data condition.
pub fn format_summary(aggregate: &AggregateStats) -> String {
    [
        format!(
            "Average request latency: {}",
            or_no_data(aggregate.average_latency_millis().map(|ms| format!("{ms:.2} ms")))
        ),
        format!("Total requests: {}", aggregate.request_count),
        format!(
            "Total request rate: {}",
            or_no_data(aggregate.throughput().map(|rate| format!("{rate:.2} req/s")))
        ),
        format!(
            "Average ON time per worker: {}",
            or_no_data(aggregate.average_on_time_per_worker().map(millis))
        ),
        format!(
            "Average OFF time per worker: {}",
            or_no_data(aggregate.average_off_time_per_worker().map(millis))
        ),
    ]
    .join("\n")
}

fn millis(duration: Duration) -> String {
    format!("{:.2} ms", duration.as_secs_f64() * 1000.0)
}

fn or_no_data<T: Display>(value: Result<T, NoDataError>) -> String {
    match value {
        Ok(value) => value.to_string(),
        Err(e) => {
            log::debug!("Summary metric unavailable: {e}");
            e.to_string()
        }
    }
}
