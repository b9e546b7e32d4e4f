pub mod fetch;
pub mod performance;
pub mod strategic;

pub use fetch::*;
pub use performance::*;
pub use strategic::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NavigationError {
    #[error("Cannot reach {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Page {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("Timed out fetching {0}")]
    Timeout(String),

    #[error("Strategic allocation section not found")]
    SectionNotFound,

    #[error("Performance table not found")]
    TableNotFound,

    #[error("Invalid selector: {0}")]
    Selector(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}
