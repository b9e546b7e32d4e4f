use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use compenswiss::config;
use compenswiss::pipeline::allocation::{
    AllocationExtractor, ExtractorConfig, Field, PatternLibrary,
};
use compenswiss::pipeline::inference::InferenceConfig;
use compenswiss::pipeline::navigation::HttpPageFetcher;
use compenswiss::runner::{run_scrape, ScrapeError, ScrapeJob, ScrapeSummary, YearSelector};

#[derive(Parser)]
#[command(name = "compenswiss")]
#[command(about = "Scrape Compenswiss investment performance and strategic allocation into dated reports", long_about = None)]
#[command(version = config::APP_VERSION)]
struct Cli {
    /// Report year, or "latest" for the current year
    #[arg(default_value = "latest")]
    year: String,

    /// Directory receiving reports/<YYYYMMDD>/ and reports/latest/
    #[arg(long, short = 'o')]
    output_dir: Option<PathBuf>,

    /// Disable the remote model fallback
    #[arg(long)]
    no_llm: bool,

    /// TOML rule file replacing the built-in pattern table
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    compenswiss::init_tracing();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(summary) => {
            if cli.json {
                match serde_json::to_string_pretty(&summary) {
                    Ok(json) => println!("{json}"),
                    Err(e) => {
                        tracing::error!(error = %e, "Cannot serialize summary");
                        return ExitCode::FAILURE;
                    }
                }
            } else {
                print_summary(&summary);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Scrape failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ScrapeSummary, ScrapeError> {
    let year: YearSelector = cli.year.parse()?;
    let output_dir = cli
        .output_dir
        .clone()
        .unwrap_or_else(config::default_output_dir);

    let mut extractor_config = ExtractorConfig::from_env()?;
    if let Some(path) = &cli.rules {
        extractor_config.patterns = PatternLibrary::from_file(path)?;
    }
    if cli.no_llm {
        extractor_config.inference = InferenceConfig::disabled();
    }
    tracing::info!(
        year = %year,
        remote = extractor_config.remote_enabled(),
        rules = extractor_config.patterns.rules().len(),
        "Configuration loaded"
    );

    let fetcher = HttpPageFetcher::with_default_timeout()?;
    let extractor = AllocationExtractor::new(extractor_config);
    let job = ScrapeJob::new(year, &output_dir);

    run_scrape(&job, &fetcher, &extractor)
}

fn print_summary(summary: &ScrapeSummary) {
    println!("Year: {}", summary.year);
    println!(
        "Performance: {} of {} table rows mapped",
        summary.performance_mapped, summary.performance_rows
    );
    if summary.performance_remote > 0 {
        println!("  {} more filled by remote fallback", summary.performance_remote);
    }
    for failure in &summary.performance_failures {
        println!("  provider {} failed: {}", failure.provider, failure.reason);
    }
    println!("Strategic allocation:");
    for field in Field::ALL {
        match summary.allocation.resolution(field) {
            Some(r) => println!("  {:<24} {:>6}%  ({}, {})", field.label(), r.value, r.tier, r.detail),
            None => println!("  {:<24} {:>7}", field.label(), "NA"),
        }
    }
    for failure in summary.allocation.provider_failures() {
        println!("  provider {} failed: {}", failure.provider, failure.reason);
    }
    println!("Confidence: {:.2}", summary.confidence);
    println!("Archive: {}", summary.dated_archive.display());
    println!("Latest:  {}", summary.latest_archive.display());
}
