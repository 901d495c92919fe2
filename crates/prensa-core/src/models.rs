use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Version stamped into every queue envelope. Bump on breaking
/// changes to [`ArticleRecord`]'s wire shape.
pub const ENVELOPE_SCHEMA_VERSION: u32 = 1;

/// Sentinel section title used until a labelled heading is seen.
pub const UNTITLED_SECTION: &str = "OTRO";

/// A group of article stubs under one listing heading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingSection {
    pub title: String,
    pub stubs: Vec<ArticleStub>,
}

/// Headline + URL pair harvested from the index page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleStub {
    pub headline: Option<String>,
    pub url: String,
}

impl ArticleStub {
    /// Only stubs pointing at a rendered article page are worth a
    /// browser session.
    pub fn is_article_page(&self) -> bool {
        self.url.ends_with(".html")
    }
}

/// A comment as found in the DOM, before sentiment classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawComment {
    pub author: String,
    pub timestamp: String,
    pub text: String,
}

/// Sentiment label for a classified comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

/// Outcome of classifying one comment. Always present on a
/// [`CommentRecord`]; provider failure and unparseable replies have
/// their own variants instead of a null.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SentimentVerdict {
    Classified {
        label: SentimentLabel,
        confidence_percent: u8,
    },
    Indeterminate,
    ProviderError,
}

/// A reader comment in DOM encounter order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub author: String,
    pub timestamp: String,
    pub text: String,
    pub sentiment: SentimentVerdict,
}

/// One ranked image tag from the vision provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisionTag {
    pub label: String,
    pub confidence: f64,
}

/// Vision-provider analysis of the article's lead image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisionAnalysis {
    pub description: String,
    pub description_confidence: f64,
    /// Top tags by confidence, at most 5.
    pub tags: Vec<VisionTag>,
}

/// Per-article enrichment results. Fields are independently optional:
/// failure of one provider never blocks population of another.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentBundle {
    /// Opaque NLU provider response (schema owned by the provider).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nlu: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vision: Option<VisionAnalysis>,
}

/// Canonical unit persisted downstream. All fields except
/// `canonical_url` are optional; absent source fields stay absent
/// rather than degrading to empty strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
    pub canonical_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_published: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_modified: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub section_path: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub keywords: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_location: Option<String>,
    #[serde(default)]
    pub comments: Vec<CommentRecord>,
    #[serde(default)]
    pub enrichment: EnrichmentBundle,
}

/// Self-describing queue payload: one envelope per ArticleRecord.
///
/// Consumers reject envelopes whose version they do not understand
/// instead of mis-parsing them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub schema_version: u32,
    pub record: ArticleRecord,
}

impl Envelope {
    pub fn new(record: ArticleRecord) -> Self {
        Self {
            schema_version: ENVELOPE_SCHEMA_VERSION,
            record,
        }
    }
}

/// What one browser session produced for one article URL.
#[derive(Debug, Clone)]
pub struct SessionExtract {
    /// Record skeleton; `comments` and `enrichment` are filled in by
    /// the enrichment pass.
    pub record: ArticleRecord,
    pub comments: Vec<RawComment>,
    /// True when no structured-data block was found on the page; the
    /// record then carries only `canonical_url`/`headline`.
    pub structured_data_missing: bool,
}

/// Counters for one harvest run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestReport {
    pub sections_seen: usize,
    pub stubs_seen: usize,
    pub articles_delivered: usize,
    pub articles_skipped: usize,
}

/// Limits for one harvest run. Both caps default to 3 sections and
/// 3 stubs; `None` lifts the cap.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub max_sections: Option<usize>,
    pub max_articles_per_section: Option<usize>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            max_sections: Some(3),
            max_articles_per_section: Some(3),
        }
    }
}

impl HarvestConfig {
    /// Remove both caps: process every section and stub.
    pub fn unlimited() -> Self {
        Self {
            max_sections: None,
            max_articles_per_section: None,
        }
    }
}

/// Configuration for a consumer process.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub consumer_id: String,
    pub poll_interval: Duration,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            consumer_id: format!("consumer-{}", &Uuid::new_v4().to_string()[..8]),
            poll_interval: Duration::from_secs(5),
        }
    }
}

impl ConsumerConfig {
    pub fn with_consumer_id(mut self, id: impl Into<String>) -> Self {
        self.consumer_id = id.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn article_page_suffix_gates_deep_extraction() {
        let html = ArticleStub {
            headline: Some("Titular".into()),
            url: "https://example.com/noticia.html".into(),
        };
        let video = ArticleStub {
            headline: None,
            url: "https://example.com/video/".into(),
        };
        assert!(html.is_article_page());
        assert!(!video.is_article_page());
    }

    #[test]
    fn absent_fields_are_omitted_from_json() {
        let record = ArticleRecord {
            canonical_url: "https://example.com/a.html".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&record).unwrap();
        let obj = json.as_object().unwrap();
        assert!(!obj.contains_key("headline"));
        assert!(!obj.contains_key("image_url"));
        assert!(!obj.contains_key("body"));
        assert_eq!(obj["canonical_url"], "https://example.com/a.html");
    }

    #[test]
    fn envelope_roundtrip_keeps_version() {
        let envelope = Envelope::new(ArticleRecord {
            canonical_url: "https://example.com/a.html".into(),
            headline: Some("Test".into()),
            ..Default::default()
        });
        let raw = serde_json::to_string(&envelope).unwrap();
        let back: Envelope = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.schema_version, ENVELOPE_SCHEMA_VERSION);
        assert_eq!(back.record.headline.as_deref(), Some("Test"));
    }

    #[test]
    fn sentiment_label_wire_form_is_uppercase() {
        let verdict = SentimentVerdict::Classified {
            label: SentimentLabel::Positive,
            confidence_percent: 92,
        };
        let json = serde_json::to_value(&verdict).unwrap();
        assert_eq!(json["label"], "POSITIVE");
        assert_eq!(json["confidence_percent"], 92);
    }
}
