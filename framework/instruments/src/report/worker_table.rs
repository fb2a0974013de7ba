use tabled::Tabled;

use crate::WorkerStats;

#[derive(Tabled)]
pub struct WorkerRow {
    pub agent_id: String,
    pub requests: u64,
    #[tabled(display = "float2")]
    pub avg_latency_ms: f64,
    #[tabled(display = "float2")]
    pub on_time_ms: f64,
    #[tabled(display = "float2")]
    pub off_time_ms: f64,
}

impl From<&WorkerStats> for WorkerRow {
    fn from(stats: &WorkerStats) -> Self {
        Self {
            agent_id: stats.agent_id.clone(),
            requests: stats.request_count,
            avg_latency_ms: if stats.request_count == 0 {
                0.0
            } else {
                stats.request_time_millis as f64 / stats.request_count as f64
            },
            on_time_ms: stats.on_time_nanos as f64 / 1_000_000.0,
            off_time_ms: stats.off_time_nanos as f64 / 1_000_000.0,
        }
    }
}

fn float2(n: &f64) -> String {
    format!("{:.2}", n)
}
