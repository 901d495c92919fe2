use std::time::Duration;

use prensa_core::error::AppError;
use prensa_core::traits::SentimentClassifier;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const PROVIDER: &str = "genai-sentiment";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// The model replies in a fixed shape ("NEGATIVO Confianza: 95%")
/// that `prensa_core::sentiment::parse_sentiment_reply` understands.
const SYSTEM_INSTRUCTION: &str = "Tu tarea será categorizar comentarios en Positivo, Negativo o \
Neutral, añadiendo un porcentaje de confianza. No hace falta que digas nada más. Ejemplo: \
NEGATIVO Confianza: 95%";

/// Generative sentiment classifier over an OpenAI-compatible chat
/// API. Works with Gemini's compatibility layer or OpenAI directly.
/// Returns the raw reply text; parsing is the caller's job.
#[derive(Clone)]
pub struct GenAiSentiment {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GenAiSentiment {
    pub fn new(api_key: &str) -> Result<Self, AppError> {
        Self::with_base_url(api_key, DEFAULT_MODEL, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: &str, model: &str, base_url: &str) -> Result<Self, AppError> {
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
            model: model.to_string(),
        })
    }
}

// ---- Chat API types ----

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl SentimentClassifier for GenAiSentiment {
    async fn classify(&self, text: &str) -> Result<String, AppError> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: SYSTEM_INSTRUCTION.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: text.to_string(),
                },
            ],
            temperature: 1.0,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
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

        let chat: ChatResponse = response.json().await.map_err(|e| AppError::Provider {
            provider: PROVIDER,
            message: format!("undecodable response: {e}"),
        })?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(AppError::Provider {
                provider: PROVIDER,
                message: "empty completion".to_string(),
            })
    }
}
