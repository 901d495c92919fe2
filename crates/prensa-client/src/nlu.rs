use std::time::Duration;

use prensa_core::error::AppError;
use prensa_core::traits::NluAnalyzer;
use reqwest::Client;
use serde_json::json;

const PROVIDER: &str = "watson-nlu";
const API_VERSION: &str = "2021-08-01";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// IBM Watson Natural Language Understanding client.
///
/// Requests entities, keywords, and concepts (capped at 5 each) plus
/// document sentiment. The response schema belongs to the provider
/// and is stored as opaque JSON.
#[derive(Clone)]
pub struct WatsonNlu {
    client: Client,
    base_url: String,
    api_key: String,
}

impl WatsonNlu {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| AppError::Provider {
                provider: PROVIDER,
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }
}

impl NluAnalyzer for WatsonNlu {
    async fn analyze(&self, text: &str) -> Result<serde_json::Value, AppError> {
        let url = format!("{}/v1/analyze?version={API_VERSION}", self.base_url);

        let body = json!({
            "text": text,
            "features": {
                "entities": { "sentiment": true, "limit": 5 },
                "keywords": { "sentiment": true, "limit": 5 },
                "concepts": { "limit": 5 },
                "sentiment": {}
            }
        });

        let response = self
            .client
            .post(&url)
            .basic_auth("apikey", Some(&self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Provider {
                provider: PROVIDER,
                message: if e.is_timeout() {
                    "request timeout".to_string()
                } else {
                    e.to_string()
                },
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Provider {
                provider: PROVIDER,
                message: format!("HTTP {}: {body}", status.as_u16()),
            });
        }

        response.json().await.map_err(|e| AppError::Provider {
            provider: PROVIDER,
            message: format!("undecodable response: {e}"),
        })
    }
}
