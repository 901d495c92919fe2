use std::time::Duration;

use prensa_core::error::AppError;
use prensa_core::models::{VisionAnalysis, VisionTag};
use prensa_core::traits::VisionAnalyzer;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

const PROVIDER: &str = "azure-vision";
const MAX_TAGS: usize = 5;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Azure Computer Vision v3.2 client for the article's lead image.
/// Asks for a Spanish description plus tags; keeps the best caption
/// and the five most confident tags.
#[derive(Clone)]
pub struct AzureVision {
    client: Client,
    endpoint: String,
    subscription_key: String,
}

impl AzureVision {
    pub fn new(endpoint: &str, subscription_key: &str) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| AppError::Provider {
                provider: PROVIDER,
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            subscription_key: subscription_key.to_string(),
        })
    }
}

#[derive(Deserialize)]
struct AnalyzeResponse {
    #[serde(default)]
    description: Description,
    #[serde(default)]
    tags: Vec<RawTag>,
}

#[derive(Deserialize, Default)]
struct Description {
    #[serde(default)]
    captions: Vec<Caption>,
}

#[derive(Deserialize)]
struct Caption {
    text: String,
    confidence: f64,
}

#[derive(Deserialize)]
struct RawTag {
    name: String,
    confidence: f64,
}

impl VisionAnalyzer for AzureVision {
    async fn analyze_image(&self, image_url: &str) -> Result<VisionAnalysis, AppError> {
        let url = format!(
            "{}/vision/v3.2/analyze?visualFeatures=Description,Tags&language=es",
            self.endpoint
        );

        let response = self
            .client
            .post(&url)
            .header("Ocp-Apim-Subscription-Key", &self.subscription_key)
            .json(&json!({ "url": image_url }))
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

        let parsed: AnalyzeResponse = response.json().await.map_err(|e| AppError::Provider {
            provider: PROVIDER,
            message: format!("undecodable response: {e}"),
        })?;

        Ok(summarize(parsed))
    }
}

/// Best caption plus the five most confident tags, ordered by
/// descending confidence.
fn summarize(response: AnalyzeResponse) -> VisionAnalysis {
    let (description, description_confidence) = response
        .description
        .captions
        .into_iter()
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
        .map(|c| (c.text, c.confidence))
        .unwrap_or_default();

    let mut tags = response.tags;
    tags.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    let tags = tags
        .into_iter()
        .take(MAX_TAGS)
        .map(|t| VisionTag {
            label: t.name,
            confidence: t.confidence,
        })
        .collect();

    VisionAnalysis {
        description,
        description_confidence,
        tags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: serde_json::Value) -> AnalyzeResponse {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn keeps_best_caption_and_top_five_tags() {
        let parsed = response(serde_json::json!({
            "description": {
                "captions": [
                    {"text": "un perro en la playa", "confidence": 0.91},
                    {"text": "un animal", "confidence": 0.40}
                ]
            },
            "tags": [
                {"name": "playa", "confidence": 0.99},
                {"name": "perro", "confidence": 0.98},
                {"name": "arena", "confidence": 0.90},
                {"name": "mar", "confidence": 0.85},
                {"name": "cielo", "confidence": 0.80},
                {"name": "nube", "confidence": 0.10}
            ]
        }));

        let analysis = summarize(parsed);
        assert_eq!(analysis.description, "un perro en la playa");
        assert!((analysis.description_confidence - 0.91).abs() < 1e-9);
        assert_eq!(analysis.tags.len(), 5);
        assert_eq!(analysis.tags[0].label, "playa");
        assert_eq!(analysis.tags[4].label, "cielo");
    }

    #[test]
    fn tags_are_reordered_by_confidence() {
        let parsed = response(serde_json::json!({
            "tags": [
                {"name": "bajo", "confidence": 0.2},
                {"name": "alto", "confidence": 0.9}
            ]
        }));
        let analysis = summarize(parsed);
        assert_eq!(analysis.tags[0].label, "alto");
    }

    #[test]
    fn empty_response_yields_empty_analysis() {
        let analysis = summarize(response(serde_json::json!({})));
        assert!(analysis.description.is_empty());
        assert!(analysis.tags.is_empty());
    }
}
