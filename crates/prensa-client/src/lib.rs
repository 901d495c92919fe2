pub mod article;
pub mod browser;
pub mod config;
pub mod fetcher;
pub mod listing;
pub mod nlu;
pub mod sentiment;
pub mod vision;

pub use article::BrowserArticleSource;
pub use browser::{BrowserEngine, SessionConfig};
pub use config::ProviderConfig;
pub use fetcher::ReqwestFetcher;
pub use listing::ListingScanner;
pub use nlu::WatsonNlu;
pub use sentiment::GenAiSentiment;
pub use vision::AzureVision;
