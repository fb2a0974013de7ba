use crate::cli::OnOffCli;
use clap::Parser;

/// Initialise the CLI and logging for the load generator.
pub fn init() -> OnOffCli {
    env_logger::init();

    OnOffCli::parse()
}
