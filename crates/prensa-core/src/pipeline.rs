use tokio_util::sync::CancellationToken;

use crate::error::AppError;
use crate::models::{HarvestConfig, HarvestReport};
use crate::traits::{ArticleSource, Enricher, ListingSource, RecordSink};

/// Orchestrates one harvest run: scan the index, then per stub
/// extract → enrich → deliver, strictly sequentially.
///
/// Generic over all collaborators via traits, so the whole pipeline
/// is testable without a browser, providers, or a queue. Per-article
/// failures are logged and skipped; only an index-scan failure aborts
/// the run.
pub struct HarvestService<L, A, E, K>
where
    L: ListingSource,
    A: ArticleSource,
    E: Enricher,
    K: RecordSink,
{
    listing: L,
    articles: A,
    enricher: E,
    sink: K,
    config: HarvestConfig,
}

impl<L, A, E, K> HarvestService<L, A, E, K>
where
    L: ListingSource,
    A: ArticleSource,
    E: Enricher,
    K: RecordSink,
{
    pub fn new(listing: L, articles: A, enricher: E, sink: K, config: HarvestConfig) -> Self {
        Self {
            listing,
            articles,
            enricher,
            sink,
            config,
        }
    }

    /// Run the pipeline for one index URL until done or cancelled.
    ///
    /// Cancellation is cooperative: it takes effect between stubs,
    /// never mid-session, so the active browser page is always torn
    /// down by its owner.
    pub async fn run(
        &self,
        index_url: &str,
        cancel: &CancellationToken,
    ) -> Result<HarvestReport, AppError> {
        let sections = self.listing.scan(index_url).await?;
        tracing::info!(%index_url, sections = sections.len(), "Listing scanned");

        let mut report = HarvestReport::default();
        let section_cap = self.config.max_sections.unwrap_or(usize::MAX);
        let stub_cap = self.config.max_articles_per_section.unwrap_or(usize::MAX);

        for section in sections.iter().take(section_cap) {
            report.sections_seen += 1;
            tracing::info!(section = %section.title, stubs = section.stubs.len(), "Processing section");

            for stub in section.stubs.iter().take(stub_cap) {
                if cancel.is_cancelled() {
                    tracing::info!("Harvest cancelled; stopping before next stub");
                    return Ok(report);
                }
                report.stubs_seen += 1;

                if !stub.is_article_page() {
                    tracing::debug!(url = %stub.url, "Not an article page; skipping");
                    report.articles_skipped += 1;
                    continue;
                }

                let extract = match self.articles.extract(stub).await {
                    Ok(extract) => extract,
                    Err(e) => {
                        tracing::warn!(url = %stub.url, error = %e, "Article extraction failed; skipping stub");
                        report.articles_skipped += 1;
                        continue;
                    }
                };

                let mut record = extract.record;
                if extract.structured_data_missing {
                    tracing::warn!(url = %stub.url, "No structured-data block; emitting partial record");
                }
                if record.headline.is_none() {
                    record.headline = stub.headline.clone();
                }

                let (enrichment, comments) = self
                    .enricher
                    .enrich(
                        record.body.as_deref(),
                        record.image_url.as_deref(),
                        extract.comments,
                    )
                    .await;
                record.enrichment = enrichment;
                record.comments = comments;

                match self.sink.deliver(&record).await {
                    Ok(()) => {
                        tracing::info!(url = %record.canonical_url, "Record delivered");
                        report.articles_delivered += 1;
                    }
                    Err(e) => {
                        tracing::error!(url = %record.canonical_url, error = %e, "Delivery failed; record lost for this run");
                        report.articles_skipped += 1;
                    }
                }
            }
        }

        tracing::info!(
            sections = report.sections_seen,
            delivered = report.articles_delivered,
            skipped = report.articles_skipped,
            "Harvest run complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::EnrichmentOrchestrator;
    use crate::models::{
        ArticleRecord, ArticleStub, ListingSection, SentimentLabel, SentimentVerdict,
        SessionExtract, VisionAnalysis,
    };
    use crate::testutil::{
        MockArticleSource, MockClassifier, MockListingSource, MockNlu, MockSink, MockVision,
    };

    fn stub(headline: &str, url: &str) -> ArticleStub {
        ArticleStub {
            headline: Some(headline.into()),
            url: url.into(),
        }
    }

    fn extract_for(url: &str) -> SessionExtract {
        SessionExtract {
            record: ArticleRecord {
                headline: Some("Test".into()),
                canonical_url: url.into(),
                ..Default::default()
            },
            comments: vec![],
            structured_data_missing: false,
        }
    }

    fn orchestrator()
    -> EnrichmentOrchestrator<MockNlu, MockVision, MockClassifier> {
        EnrichmentOrchestrator::new(
            MockNlu::new(serde_json::json!({})),
            MockVision::new(VisionAnalysis {
                description: String::new(),
                description_confidence: 0.0,
                tags: vec![],
            }),
            MockClassifier::new("POSITIVO Confianza: 92%"),
        )
    }

    #[tokio::test]
    async fn two_sections_deliver_one_record_each() {
        // Index page with a titled "Local" section and an untitled
        // one that inherits the sentinel.
        let listing = MockListingSource::new(vec![
            ListingSection {
                title: "Local".into(),
                stubs: vec![stub("Test", "https://example.com/local/a.html")],
            },
            ListingSection {
                title: "OTRO".into(),
                stubs: vec![stub("Test", "https://example.com/b.html")],
            },
        ]);
        let articles = MockArticleSource::new()
            .with_extract("https://example.com/local/a.html", extract_for("https://example.com/local/a.html"))
            .with_extract("https://example.com/b.html", extract_for("https://example.com/b.html"));
        let sink = MockSink::new();

        let service = HarvestService::new(
            listing,
            articles,
            orchestrator(),
            sink.clone(),
            HarvestConfig::default(),
        );
        let report = service
            .run("https://example.com/", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.sections_seen, 2);
        assert_eq!(report.articles_delivered, 2);
        assert_eq!(report.articles_skipped, 0);

        // The sink is invoked exactly once per stub.
        let delivered = sink.delivered();
        assert_eq!(delivered.len(), 2);
        assert_eq!(delivered[0].headline.as_deref(), Some("Test"));
        assert!(delivered[0].comments.is_empty());
        // No image in the structured block, so vision stays absent.
        assert!(delivered[0].enrichment.vision.is_none());
    }

    #[tokio::test]
    async fn listing_failure_aborts_the_run() {
        let service = HarvestService::new(
            MockListingSource::with_error(AppError::Fetch("HTTP 503".into())),
            MockArticleSource::new(),
            orchestrator(),
            MockSink::new(),
            HarvestConfig::default(),
        );
        let err = service
            .run("https://example.com/", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Fetch(_)));
    }

    #[tokio::test]
    async fn navigation_failure_skips_only_that_stub() {
        let listing = MockListingSource::new(vec![ListingSection {
            title: "Local".into(),
            stubs: vec![
                stub("Roto", "https://example.com/roto.html"),
                stub("Bien", "https://example.com/bien.html"),
            ],
        }]);
        let articles = MockArticleSource::new()
            .with_error(
                "https://example.com/roto.html",
                AppError::Navigation("net::ERR_TIMED_OUT".into()),
            )
            .with_extract("https://example.com/bien.html", extract_for("https://example.com/bien.html"));
        let sink = MockSink::new();

        let service = HarvestService::new(
            listing,
            articles,
            orchestrator(),
            sink.clone(),
            HarvestConfig::default(),
        );
        let report = service
            .run("https://example.com/", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.articles_delivered, 1);
        assert_eq!(report.articles_skipped, 1);
        assert_eq!(sink.delivered().len(), 1);
    }

    #[tokio::test]
    async fn non_article_urls_are_not_extracted() {
        let listing = MockListingSource::new(vec![ListingSection {
            title: "Local".into(),
            stubs: vec![stub("Video", "https://example.com/video/")],
        }]);
        let articles = MockArticleSource::new();
        let service = HarvestService::new(
            listing,
            articles.clone(),
            orchestrator(),
            MockSink::new(),
            HarvestConfig::default(),
        );

        let report = service
            .run("https://example.com/", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.articles_skipped, 1);
        assert_eq!(articles.calls(), 0);
    }

    #[tokio::test]
    async fn section_and_stub_caps_are_honored() {
        let many_stubs: Vec<_> = (0..5)
            .map(|i| stub("t", &format!("https://example.com/{i}.html")))
            .collect();
        let mut sections = Vec::new();
        for i in 0..4 {
            sections.push(ListingSection {
                title: format!("S{i}"),
                stubs: many_stubs.clone(),
            });
        }
        let mut articles = MockArticleSource::new();
        for i in 0..5 {
            let url = format!("https://example.com/{i}.html");
            articles = articles.with_extract(&url, extract_for(&url));
        }
        let sink = MockSink::new();

        let service = HarvestService::new(
            MockListingSource::new(sections),
            articles,
            orchestrator(),
            sink.clone(),
            HarvestConfig::default(), // 3 sections x 3 stubs
        );
        let report = service
            .run("https://example.com/", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.sections_seen, 3);
        assert_eq!(report.stubs_seen, 9);
        assert_eq!(sink.delivered().len(), 9);
    }

    #[tokio::test]
    async fn cancellation_stops_between_stubs() {
        let listing = MockListingSource::new(vec![ListingSection {
            title: "Local".into(),
            stubs: vec![stub("a", "https://example.com/a.html")],
        }]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let sink = MockSink::new();
        let service = HarvestService::new(
            listing,
            MockArticleSource::new(),
            orchestrator(),
            sink.clone(),
            HarvestConfig::default(),
        );
        let report = service.run("https://example.com/", &cancel).await.unwrap();

        assert_eq!(report.stubs_seen, 0);
        assert!(sink.delivered().is_empty());
    }

    #[tokio::test]
    async fn comment_sentiment_flows_into_the_delivered_record() {
        let listing = MockListingSource::new(vec![ListingSection {
            title: "Local".into(),
            stubs: vec![stub("Test", "https://example.com/a.html")],
        }]);
        let mut extract = extract_for("https://example.com/a.html");
        extract.comments = vec![crate::models::RawComment {
            author: "Lector".into(),
            timestamp: "Hace 1 hora".into(),
            text: "Me encanta este artículo".into(),
        }];
        let articles =
            MockArticleSource::new().with_extract("https://example.com/a.html", extract);
        let sink = MockSink::new();

        let service = HarvestService::new(
            listing,
            articles,
            orchestrator(),
            sink.clone(),
            HarvestConfig::default(),
        );
        service
            .run("https://example.com/", &CancellationToken::new())
            .await
            .unwrap();

        let delivered = sink.delivered();
        assert_eq!(
            delivered[0].comments[0].sentiment,
            SentimentVerdict::Classified {
                label: SentimentLabel::Positive,
                confidence_percent: 92,
            }
        );
    }
}
