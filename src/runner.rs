//! End-to-end scrape: performance table, strategic allocation text, the
//! three-tier extractor, then dated report files.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{Datelike, Local, NaiveDate};
use serde::Serialize;
use thiserror::Error;

use crate::config;
use crate::pipeline::allocation::confidence::overall_confidence;
use crate::pipeline::allocation::{AllocationError, AllocationExtractor, ExtractionResult};
use crate::pipeline::inference::ProviderFailure;
use crate::pipeline::navigation::{
    extract_strategic_text, read_performance_table, NavigationError, PageFetcher, PerformanceTable,
};
use crate::report::{publish_report, PublishedReport, ReportError, ReportRow};

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("Navigation failed: {0}")]
    Navigation(#[from] NavigationError),

    #[error("Extractor configuration error: {0}")]
    Allocation(#[from] AllocationError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("Invalid year '{0}': expected a four-digit year or 'latest'")]
    InvalidYear(String),
}

/// Which year the report row is labelled with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum YearSelector {
    #[default]
    Latest,
    Year(i32),
}

impl YearSelector {
    /// `Latest` resolves to the year of `today`.
    pub fn resolve(&self, today: NaiveDate) -> i32 {
        match self {
            Self::Latest => today.year(),
            Self::Year(year) => *year,
        }
    }
}

impl FromStr for YearSelector {
    type Err = ScrapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("latest") {
            return Ok(Self::Latest);
        }
        match trimmed.parse::<i32>() {
            Ok(year) if (1000..=9999).contains(&year) => Ok(Self::Year(year)),
            _ => Err(ScrapeError::InvalidYear(s.to_string())),
        }
    }
}

impl fmt::Display for YearSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => f.write_str("latest"),
            Self::Year(year) => write!(f, "{year}"),
        }
    }
}

/// Inputs of one scrape.
#[derive(Debug, Clone)]
pub struct ScrapeJob {
    pub year: YearSelector,
    pub output_dir: PathBuf,
    pub performance_url: String,
    pub strategic_url: String,
    /// Date stamped on report folders and files.
    pub report_date: NaiveDate,
}

impl ScrapeJob {
    /// Live site pages, today's date.
    pub fn new(year: YearSelector, output_dir: &Path) -> Self {
        Self {
            year,
            output_dir: output_dir.to_path_buf(),
            performance_url: config::performance_page(),
            strategic_url: config::strategic_allocation_page(),
            report_date: Local::now().date_naive(),
        }
    }

    pub fn with_report_date(mut self, date: NaiveDate) -> Self {
        self.report_date = date;
        self
    }
}

/// What a scrape produced.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeSummary {
    pub year: i32,
    pub performance_rows: usize,
    pub performance_mapped: usize,
    /// Performance columns filled by the remote fallback.
    pub performance_remote: usize,
    pub performance_failures: Vec<ProviderFailure>,
    pub allocation: ExtractionResult,
    pub confidence: f32,
    pub missing_columns: Vec<usize>,
    pub dated_archive: PathBuf,
    pub latest_archive: PathBuf,
    #[serde(skip)]
    pub row: ReportRow,
}

/// Run a full scrape with the given page source and extractor.
pub fn run_scrape(
    job: &ScrapeJob,
    fetcher: &dyn PageFetcher,
    extractor: &AllocationExtractor,
) -> Result<ScrapeSummary, ScrapeError> {
    let year = job.year.resolve(job.report_date);
    let _span = tracing::info_span!("scrape", year).entered();
    tracing::info!(output = %job.output_dir.display(), "Starting scrape");

    let mut row = ReportRow::new(year);

    let performance_html = fetcher.fetch(&job.performance_url)?;
    let table = read_performance_table(&performance_html)?;
    let performance_mapped = row.fill_performance(&table);
    let (performance_remote, performance_failures) =
        fill_missing_performance(&mut row, &table, extractor);

    let strategic_html = fetcher.fetch(&job.strategic_url)?;
    let strategic_text = extract_strategic_text(&strategic_html)?;
    if strategic_text.is_empty() {
        tracing::warn!("Strategic allocation section has no text");
    }
    let allocation = extractor.extract(&strategic_text);
    row.fill_allocation(&allocation);

    let published: PublishedReport = publish_report(&job.output_dir, &row, job.report_date)?;

    let summary = ScrapeSummary {
        year,
        performance_rows: table.len(),
        performance_mapped,
        performance_remote,
        performance_failures,
        confidence: overall_confidence(&allocation),
        allocation,
        missing_columns: row.missing_columns(),
        dated_archive: published.dated_archive(),
        latest_archive: published.latest_archive(),
        row,
    };
    tracing::info!(
        missing = summary.missing_columns.len(),
        archive = %summary.dated_archive.display(),
        "Scrape complete"
    );
    Ok(summary)
}

/// Ask the remote chain for mapped performance rows the table lacked.
fn fill_missing_performance(
    row: &mut ReportRow,
    table: &PerformanceTable,
    extractor: &AllocationExtractor,
) -> (usize, Vec<ProviderFailure>) {
    let missing = row.missing_performance_labels();
    let Some(client) = extractor.remote().filter(|_| !missing.is_empty()) else {
        return (0, Vec::new());
    };
    let outcome = client.infer_performance(&table.as_prompt_text(), &missing);
    let filled = row.fill_performance_amounts(&outcome.amounts);
    tracing::info!(missing = missing.len(), filled, "Remote performance fallback finished");
    (filled, outcome.failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::allocation::{ExtractorConfig, Field, Tier};
    use crate::pipeline::inference::{InferenceError, MockProvider, RemoteInferenceClient};
    use crate::pipeline::navigation::StaticPageFetcher;

    const PERFORMANCE_HTML: &str = r#"<table class="table--chart"><tbody>
        <tr><td>Money market investments</td><td>1&nbsp;234</td></tr>
        <tr><td>Equities:<sup>1</sup></td><td>5,678</td></tr>
        <tr><td>Gold</td><td>90</td></tr>
    </tbody></table>"#;

    const STRATEGIC_HTML: &str = r#"
        <h3>Structure of the strategic allocation</h3>
        <p>Foreign currency bonds account for 37% of the allocations.</p>
        <p>Equities account for 28%. Bonds denominated in CHF account for 17%.</p>
        <p>Real estate accounts for 15%. Precious metals account for 3%.</p>
        <h3>Other</h3>"#;

    fn job(dir: &Path, year: YearSelector) -> ScrapeJob {
        ScrapeJob {
            year,
            output_dir: dir.to_path_buf(),
            performance_url: "https://test/performance".into(),
            strategic_url: "https://test/strategic".into(),
            report_date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
        }
    }

    fn fetcher() -> StaticPageFetcher {
        StaticPageFetcher::new()
            .with_page("https://test/performance", PERFORMANCE_HTML)
            .with_page("https://test/strategic", STRATEGIC_HTML)
    }

    #[test]
    fn full_scrape_fills_row_and_publishes() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = AllocationExtractor::new(ExtractorConfig::local_only());

        let summary =
            run_scrape(&job(dir.path(), YearSelector::Year(2024)), &fetcher(), &extractor).unwrap();

        assert_eq!(summary.year, 2024);
        assert_eq!(summary.performance_rows, 3);
        assert_eq!(summary.performance_mapped, 3);
        assert_eq!(summary.row.cell(1), Some("1234"));
        assert_eq!(summary.row.cell(11), Some("5678"));
        assert_eq!(summary.row.cell(20), Some("90"));
        assert_eq!(summary.row.cell(28), Some("37"));
        assert_eq!(summary.row.cell(32), Some("3"));
        assert!(summary.allocation.is_complete());
        assert_eq!(summary.allocation.tier(Field::Equities), Some(Tier::Pattern));
        assert!(summary.dated_archive.is_file());
        assert!(summary.latest_archive.is_file());
        assert!(!summary.missing_columns.contains(&28));
    }

    #[test]
    fn remote_fallback_fills_performance_rows_missing_from_table() {
        let dir = tempfile::tempdir().unwrap();
        let client = RemoteInferenceClient::new(vec![
            Box::new(MockProvider::failing("groq", InferenceError::RateLimited)),
            Box::new(MockProvider::ok("gemini", r#"{"Swiss francs bonds": "7,001"}"#)),
        ]);
        let extractor =
            AllocationExtractor::with_remote(ExtractorConfig::local_only(), Some(client));

        let summary =
            run_scrape(&job(dir.path(), YearSelector::Year(2024)), &fetcher(), &extractor).unwrap();

        assert_eq!(summary.performance_mapped, 3);
        assert_eq!(summary.performance_remote, 1);
        assert_eq!(summary.row.cell(3), Some("7001"));
        assert_eq!(summary.row.cell(1), Some("1234"));
        assert_eq!(summary.performance_failures.len(), 1);
        assert!(summary.allocation.is_complete());
    }

    #[test]
    fn local_only_run_makes_no_performance_request() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = AllocationExtractor::new(ExtractorConfig::local_only());
        let summary =
            run_scrape(&job(dir.path(), YearSelector::Year(2024)), &fetcher(), &extractor).unwrap();
        assert_eq!(summary.performance_remote, 0);
        assert!(summary.performance_failures.is_empty());
        assert_eq!(summary.row.cell(3), None);
    }

    #[test]
    fn latest_uses_report_date_year() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = AllocationExtractor::new(ExtractorConfig::local_only());
        let summary =
            run_scrape(&job(dir.path(), YearSelector::Latest), &fetcher(), &extractor).unwrap();
        assert_eq!(summary.year, 2025);
        assert_eq!(summary.row.year(), Some("2025"));
    }

    #[test]
    fn missing_page_aborts_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = AllocationExtractor::new(ExtractorConfig::local_only());
        let fetcher = StaticPageFetcher::new().with_page("https://test/performance", PERFORMANCE_HTML);

        let err = run_scrape(&job(dir.path(), YearSelector::Latest), &fetcher, &extractor)
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Navigation(_)));
        assert!(!dir.path().join("reports").exists());
    }

    #[test]
    fn unresolved_allocation_still_publishes_na() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = AllocationExtractor::with_tiers(Vec::new(), None);
        let summary =
            run_scrape(&job(dir.path(), YearSelector::Year(2024)), &fetcher(), &extractor).unwrap();
        assert!(summary.allocation.resolved().is_empty());
        assert!(summary.missing_columns.contains(&28));
        assert_eq!(summary.row.rendered()[32], "NA");
    }

    #[test]
    fn summary_serializes_to_json() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = AllocationExtractor::new(ExtractorConfig::local_only());
        let summary =
            run_scrape(&job(dir.path(), YearSelector::Year(2024)), &fetcher(), &extractor).unwrap();
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["year"], 2024);
        assert_eq!(json["allocation"]["resolved"]["equities_pct"]["tier"], "pattern");
    }

    #[test]
    fn year_selector_parsing() {
        assert_eq!("latest".parse::<YearSelector>().unwrap(), YearSelector::Latest);
        assert_eq!("LATEST".parse::<YearSelector>().unwrap(), YearSelector::Latest);
        assert_eq!("2023".parse::<YearSelector>().unwrap(), YearSelector::Year(2023));
        assert!("23".parse::<YearSelector>().is_err());
        assert!("next".parse::<YearSelector>().is_err());
    }
}
