use anyhow::{Context, Result};
use std::path::PathBuf;
use tripscout::config::TripScoutConfig;
use tripscout::{CsvSink, HttpFetcher, Pipeline, logging};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = TripScoutConfig::load_from_path(config_path).context("Failed to load configuration")?;

    logging::init(&config.logging).context("Failed to initialise logging")?;
    tracing::info!("TripScout {} starting", tripscout::VERSION);

    let mut sink = CsvSink::new(&config.run.output_dir)
        .with_context(|| format!("Failed to prepare output directory {}", config.run.output_dir))?;
    let fetcher = HttpFetcher::new().context("Failed to create HTTP client")?;
    let pipeline = Pipeline::new(fetcher, config).context("Invalid pipeline configuration")?;

    let report = pipeline.run(&mut sink).await.context("Pipeline run failed")?;

    println!("Top locations:");
    for (position, summary) in report.top_locations.iter().enumerate() {
        println!(
            "  {}. {} - score {:.2} ({:.1}°C, {:.1} mm rain)",
            position + 1,
            summary.name(),
            summary.score(),
            summary.temp_mean,
            summary.rain_sum
        );
    }
    println!(
        "{} lodging candidates, {} located. Tables written to {}",
        report.lodgings.len(),
        report.lodgings.iter().filter(|l| l.is_located()).count(),
        sink.directory().display()
    );

    Ok(())
}
