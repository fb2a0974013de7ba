mod cli;
mod config;
mod executor;
mod init;
mod issuer;
mod monitor;
mod phase;
mod progress;
mod run;
mod shutdown;
mod summary;
mod variate;

pub mod prelude {
    pub use crate::cli::OnOffCli;
    pub use crate::config::{ConfigurationError, Phase, RunConfig};
    pub use crate::executor::Executor;
    pub use crate::init::init;
    pub use crate::issuer::{BoxError, HttpRequestIssuer, RequestIssuer, TransportError};
    pub use crate::phase::{PhaseRunner, PhaseState, WorkerError};
    pub use crate::run::{run, RunError, RunOutcome};
    pub use crate::shutdown::linger;
    pub use crate::summary::{build_run_summary, write_run_summary};
    pub use crate::variate::{Rate, VariateSource};

    pub use onoff_instruments::{
        aggregate, format_summary, AggregateStats, NoDataError, SummaryReport, WorkerStats,
    };
}
