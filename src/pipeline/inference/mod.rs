pub mod types;
pub mod prompt;
pub mod parser;
pub mod providers;
pub mod client;

pub use types::*;
pub use prompt::*;
pub use parser::*;
pub use providers::*;
pub use client::*;

use serde::Serialize;
use thiserror::Error;

/// Failure of a single provider attempt. Never escapes the extractor:
/// it is recorded and the next provider is tried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    #[error("Provider unreachable at {0}")]
    Connection(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Authentication rejected (status {0})")]
    Auth(u16),

    #[error("Rate limited by provider")]
    RateLimited,

    #[error("Provider returned error (status {status}): {body}")]
    Http { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("JSON parsing error: {0}")]
    JsonParsing(String),

    #[error("Response contained no usable values")]
    EmptyResult,

    #[error("No API key configured for {0}")]
    MissingApiKey(String),
}

/// A provider failure recorded during one extraction run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderFailure {
    pub provider: String,
    pub reason: String,
}

impl ProviderFailure {
    pub fn new(provider: &str, error: &InferenceError) -> Self {
        Self {
            provider: provider.to_string(),
            reason: error.to_string(),
        }
    }
}
