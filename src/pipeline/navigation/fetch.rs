use std::collections::HashMap;
use std::time::Duration;

use super::NavigationError;
use crate::config;

/// Source of page HTML (allows mocking).
pub trait PageFetcher {
    fn fetch(&self, url: &str) -> Result<String, NavigationError>;
}

/// Static HTML over blocking HTTP. No script execution.
pub struct HttpPageFetcher {
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl HttpPageFetcher {
    pub fn new(timeout_secs: u64) -> Result<Self, NavigationError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(format!("{}/{}", config::APP_NAME, config::APP_VERSION))
            .build()
            .map_err(|e| NavigationError::HttpClient(e.to_string()))?;
        Ok(Self {
            client,
            timeout_secs,
        })
    }

    pub fn with_default_timeout() -> Result<Self, NavigationError> {
        Self::new(config::PAGE_FETCH_TIMEOUT_SECS)
    }
}

impl PageFetcher for HttpPageFetcher {
    fn fetch(&self, url: &str) -> Result<String, NavigationError> {
        tracing::info!(url = %url, "Fetching page");

        let response = self.client.get(url).send().map_err(|e| {
            if e.is_timeout() {
                NavigationError::Timeout(url.to_string())
            } else {
                NavigationError::Fetch {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(NavigationError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().map_err(|e| NavigationError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        tracing::debug!(
            url = %url,
            bytes = body.len(),
            timeout_secs = self.timeout_secs,
            "Page fetched"
        );
        Ok(body)
    }
}

/// Fixed url → HTML map, for tests and offline runs.
#[derive(Debug, Default, Clone)]
pub struct StaticPageFetcher {
    pages: HashMap<String, String>,
}

impl StaticPageFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }
}

impl PageFetcher for StaticPageFetcher {
    fn fetch(&self, url: &str) -> Result<String, NavigationError> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| NavigationError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}
