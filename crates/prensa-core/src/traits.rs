use std::future::Future;

use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    ArticleRecord, ArticleStub, CommentRecord, EnrichmentBundle, ListingSection, RawComment,
    SessionExtract, VisionAnalysis,
};

/// Fetches the raw body of a URL over plain HTTP.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Produces section-grouped article stubs from an index page.
pub trait ListingSource: Send + Sync {
    fn scan(
        &self,
        index_url: &str,
    ) -> impl Future<Output = Result<Vec<ListingSection>, AppError>> + Send;
}

/// Drives one browser session per stub and extracts the article.
///
/// Implementations must tear the session down on every exit path,
/// including navigation failure.
pub trait ArticleSource: Send + Sync {
    fn extract(
        &self,
        stub: &ArticleStub,
    ) -> impl Future<Output = Result<SessionExtract, AppError>> + Send;
}

/// Natural-language analysis of the article body. The response schema
/// is owned by the provider and passed through as opaque JSON.
pub trait NluAnalyzer: Send + Sync {
    fn analyze(
        &self,
        text: &str,
    ) -> impl Future<Output = Result<serde_json::Value, AppError>> + Send;
}

/// Caption and tag analysis of the article's lead image.
pub trait VisionAnalyzer: Send + Sync {
    fn analyze_image(
        &self,
        image_url: &str,
    ) -> impl Future<Output = Result<VisionAnalysis, AppError>> + Send;
}

/// Generative sentiment classification of one comment.
///
/// Returns the provider's raw reply text; turning it into a
/// [`crate::models::SentimentVerdict`] is the caller's job (see
/// [`crate::sentiment::parse_sentiment_reply`]).
pub trait SentimentClassifier: Send + Sync {
    fn classify(&self, text: &str) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Enriches one extracted article. Infallible by contract: provider
/// failures degrade to the per-field fallback sentinels.
pub trait Enricher: Send + Sync {
    fn enrich(
        &self,
        body: Option<&str>,
        image_url: Option<&str>,
        comments: Vec<RawComment>,
    ) -> impl Future<Output = (EnrichmentBundle, Vec<CommentRecord>)> + Send;
}

/// Where the pipeline delivers finished records: the queue publisher
/// or the standalone file sink.
pub trait RecordSink: Send + Sync {
    fn deliver(&self, record: &ArticleRecord) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// Document store for enriched records, scoped by site.
pub trait ArticleStore: Send + Sync + Clone {
    /// Insert or update by `(site, canonical_url)`. Returns the
    /// document id.
    fn upsert(
        &self,
        site: &str,
        record: &ArticleRecord,
    ) -> impl Future<Output = Result<Uuid, AppError>> + Send;
}
