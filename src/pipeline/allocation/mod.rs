pub mod confidence;
pub mod orchestrator;
pub mod patterns;
pub mod proximity;
pub mod types;
pub mod validation;

pub use orchestrator::*;
pub use patterns::*;
pub use proximity::*;
pub use types::*;

use thiserror::Error;

/// Configuration-time errors. Extraction itself never fails.
#[derive(Error, Debug)]
pub enum AllocationError {
    #[error("Invalid pattern in rule '{rule}': {reason}")]
    InvalidPattern { rule: String, reason: String },

    #[error("Cannot read rule file: {0}")]
    RuleFile(#[from] std::io::Error),

    #[error("Rule file parse error: {0}")]
    RuleFileParse(String),
}
