use std::time::Duration;

use prensa_core::error::AppError;
use prensa_core::traits::Fetcher;
use reqwest::Client;

/// HTTP fetcher using reqwest. Used for the index page, which is
/// server-rendered and needs no browser.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
    timeout_secs: u64,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let timeout_secs = timeout.as_secs();
        let client = Client::builder()
            .user_agent("Prensa/0.1 (news harvester)")
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Fetch(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs,
        })
    }
}

impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                AppError::Fetch(format!("connection failed: {e}"))
            } else {
                AppError::Fetch(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Fetch(format!(
                "HTTP {} for {url}",
                status.as_u16()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| AppError::Fetch(format!("failed to read response body: {e}")))
    }
}
