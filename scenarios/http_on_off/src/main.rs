use onoff_runner::prelude::*;

fn main() -> anyhow::Result<()> {
    let cli = init();
    let config = cli.to_config();

    let started_at = chrono::Utc::now();
    let result = run(&config, |config, _| HttpRequestIssuer::new(config));

    if let Some(path) = &cli.summary_file {
        // The printed results are still useful if the summary can't be stored.
        if let Err(e) =
            write_run_summary(path, env!("CARGO_PKG_NAME"), &config, started_at, &result)
        {
            log::error!("Failed to write run summary: {e:?}");
        }
    }

    let outcome = result?;
    SummaryReport::new(&outcome.aggregate, &outcome.workers).print();

    if cli.linger {
        linger()?;
    }

    Ok(())
}
