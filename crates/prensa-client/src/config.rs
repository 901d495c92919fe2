use prensa_core::AppError;

/// Credentials and endpoints for the three enrichment providers.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub watson_url: String,
    pub watson_api_key: String,
    pub vision_endpoint: String,
    pub vision_key: String,
    pub genai_api_key: String,
}

impl ProviderConfig {
    /// Read configuration from environment variables.
    ///
    /// - `IBM_URL` / `IBM_API_KEY` (Watson NLU)
    /// - `AZURE_ENDPOINT` / `AZURE_SUBSCRIPTION_KEY` (Computer Vision)
    /// - `GENAI_API_KEY` (generative sentiment)
    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self {
            watson_url: require("IBM_URL")?,
            watson_api_key: require("IBM_API_KEY")?,
            vision_endpoint: require("AZURE_ENDPOINT")?,
            vision_key: require("AZURE_SUBSCRIPTION_KEY")?,
            genai_api_key: require("GENAI_API_KEY")?,
        })
    }
}

fn require(name: &str) -> Result<String, AppError> {
    std::env::var(name)
        .map_err(|_| AppError::Config(format!("{name} not set. Required for enrichment.")))
}
