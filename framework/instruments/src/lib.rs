mod report;
mod stats;

pub use report::{format_summary, SummaryReport};
pub use stats::{aggregate, AggregateStats, NoDataError, WorkerStats};
