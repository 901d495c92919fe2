use crate::models::{CommentRecord, EnrichmentBundle, RawComment, SentimentVerdict, VisionAnalysis};
use crate::sentiment::parse_sentiment_reply;
use crate::traits::{Enricher, NluAnalyzer, SentimentClassifier, VisionAnalyzer};

/// Calls the three analysis providers and normalizes their results
/// into the data model.
///
/// Each provider group is independent: a failed or absent result
/// degrades that field to its fallback sentinel (`None` for NLU and
/// vision, `ProviderError` for sentiment) without touching the other
/// fields. The groups run concurrently since none depends on
/// another's output.
pub struct EnrichmentOrchestrator<N, V, C>
where
    N: NluAnalyzer,
    V: VisionAnalyzer,
    C: SentimentClassifier,
{
    nlu: N,
    vision: V,
    classifier: C,
}

impl<N, V, C> EnrichmentOrchestrator<N, V, C>
where
    N: NluAnalyzer,
    V: VisionAnalyzer,
    C: SentimentClassifier,
{
    pub fn new(nlu: N, vision: V, classifier: C) -> Self {
        Self {
            nlu,
            vision,
            classifier,
        }
    }

    async fn analyze_body(&self, body: Option<&str>) -> Option<serde_json::Value> {
        let body = body?;
        match self.nlu.analyze(body).await {
            Ok(analysis) => Some(analysis),
            Err(e) => {
                tracing::warn!(error = %e, "NLU analysis failed; leaving field absent");
                None
            }
        }
    }

    async fn analyze_image(&self, image_url: Option<&str>) -> Option<VisionAnalysis> {
        // No resolvable image URL is not an error: the field is
        // simply absent.
        let image_url = image_url?;
        match self.vision.analyze_image(image_url).await {
            Ok(analysis) => Some(analysis),
            Err(e) => {
                tracing::warn!(%image_url, error = %e, "Vision analysis failed; leaving field absent");
                None
            }
        }
    }

    async fn classify_comments(&self, comments: Vec<RawComment>) -> Vec<CommentRecord> {
        let mut records = Vec::with_capacity(comments.len());
        for comment in comments {
            let sentiment = match self.classifier.classify(&comment.text).await {
                Ok(reply) => parse_sentiment_reply(&reply),
                Err(e) => {
                    tracing::warn!(error = %e, "Sentiment classification failed");
                    SentimentVerdict::ProviderError
                }
            };
            records.push(CommentRecord {
                author: comment.author,
                timestamp: comment.timestamp,
                text: comment.text,
                sentiment,
            });
        }
        records
    }
}

impl<N, V, C> Enricher for EnrichmentOrchestrator<N, V, C>
where
    N: NluAnalyzer,
    V: VisionAnalyzer,
    C: SentimentClassifier,
{
    async fn enrich(
        &self,
        body: Option<&str>,
        image_url: Option<&str>,
        comments: Vec<RawComment>,
    ) -> (EnrichmentBundle, Vec<CommentRecord>) {
        let (nlu, vision, comments) = tokio::join!(
            self.analyze_body(body),
            self.analyze_image(image_url),
            self.classify_comments(comments),
        );
        (EnrichmentBundle { nlu, vision }, comments)
    }
}
