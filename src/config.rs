use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Compenswiss";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Root of the annual-report site.
pub const BASE_URL: &str = "https://ar.compenswiss.ch";

/// Dataset identifier used in report file names.
pub const DATASET_NAME: &str = "CHEF_COMPENSWISS";

/// Timeout for page fetches, in seconds.
pub const PAGE_FETCH_TIMEOUT_SECS: u64 = 30;

pub fn investments_page() -> String {
    format!("{BASE_URL}/en_GB/investments")
}

pub fn performance_page() -> String {
    format!("{BASE_URL}/en_GB/investments/performance")
}

pub fn strategic_allocation_page() -> String {
    format!("{BASE_URL}/en_GB/investments/strategic-asset-allocation")
}

/// Measure URL recorded in the META sheet for strategic allocation columns.
pub fn strategic_measure_url() -> String {
    format!("{BASE_URL}/en_GB/investments/strategic-asset-allocation-sva")
}

/// Default tracing filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "compenswiss=info,warn"
}

/// Get the application data directory.
/// ~/Compenswiss/ on all platforms; falls back to the working directory
/// when no home directory can be determined.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default output directory for reports.
pub fn default_output_dir() -> PathBuf {
    app_data_dir()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_data_dir_named_after_app() {
        assert!(app_data_dir().ends_with("Compenswiss"));
    }

    #[test]
    fn page_urls_share_base() {
        assert!(performance_page().starts_with(BASE_URL));
        assert!(strategic_allocation_page().ends_with("strategic-asset-allocation"));
        assert!(investments_page().ends_with("/investments"));
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, env!("CARGO_PKG_VERSION"));
    }
}
