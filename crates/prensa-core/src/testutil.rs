//! Test utilities: mock implementations of all core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{ArticleRecord, ArticleStub, ListingSection, SessionExtract, VisionAnalysis};
use crate::queue::{AbandonOutcome, DeliveryPolicy, MessageQueue, QueuedMessage};
use crate::traits::{
    ArticleSource, ArticleStore, Fetcher, ListingSource, NluAnalyzer, RecordSink,
    SentimentClassifier, VisionAnalyzer,
};

/// A minimal but realistic record for sink/store tests.
pub fn make_test_record(canonical_url: &str) -> ArticleRecord {
    ArticleRecord {
        headline: Some("Titular de prueba".to_string()),
        canonical_url: canonical_url.to_string(),
        body: Some("Cuerpo del artículo.".to_string()),
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher that returns a configurable response.
#[derive(Clone)]
pub struct MockFetcher {
    /// Queue of responses. Each call pops the first element.
    /// If empty, returns a default HTML string.
    responses: Arc<Mutex<Vec<Result<String, AppError>>>>,
}

impl MockFetcher {
    pub fn new(html: &str) -> Self {
        Self {
            responses: Arc::new(Mutex::new(vec![Ok(html.to_string())])),
        }
    }

    pub fn with_error(error: AppError) -> Self {
        Self {
            responses: Arc::new(Mutex::new(vec![Err(error)])),
        }
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, _url: &str) -> Result<String, AppError> {
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok("<html><body>default</body></html>".to_string())
        } else {
            responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// MockListingSource
// ---------------------------------------------------------------------------

/// Mock listing that returns fixed sections or a one-shot error.
pub struct MockListingSource {
    sections: Vec<ListingSection>,
    error: Mutex<Option<AppError>>,
}

impl MockListingSource {
    pub fn new(sections: Vec<ListingSection>) -> Self {
        Self {
            sections,
            error: Mutex::new(None),
        }
    }

    pub fn with_error(error: AppError) -> Self {
        Self {
            sections: Vec::new(),
            error: Mutex::new(Some(error)),
        }
    }
}

impl ListingSource for MockListingSource {
    async fn scan(&self, _index_url: &str) -> Result<Vec<ListingSection>, AppError> {
        if let Some(e) = self.error.lock().unwrap().take() {
            return Err(e);
        }
        Ok(self.sections.clone())
    }
}

// ---------------------------------------------------------------------------
// MockArticleSource
// ---------------------------------------------------------------------------

/// What a registered URL yields. Errors are stored as their message
/// so repeated extracts of the same URL behave identically.
#[derive(Clone)]
enum ExtractOutcome {
    Extract(SessionExtract),
    Fail(String),
}

/// Mock article source keyed by URL: each URL maps to either a
/// prepared extract or an error. Unknown URLs fail the test loudly.
#[derive(Clone, Default)]
pub struct MockArticleSource {
    extracts: Arc<Mutex<HashMap<String, ExtractOutcome>>>,
    calls: Arc<Mutex<usize>>,
}

impl MockArticleSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extract(self, url: &str, extract: SessionExtract) -> Self {
        self.extracts
            .lock()
            .unwrap()
            .insert(url.to_string(), ExtractOutcome::Extract(extract));
        self
    }

    pub fn with_error(self, url: &str, error: AppError) -> Self {
        self.extracts
            .lock()
            .unwrap()
            .insert(url.to_string(), ExtractOutcome::Fail(error.to_string()));
        self
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl ArticleSource for MockArticleSource {
    async fn extract(&self, stub: &ArticleStub) -> Result<SessionExtract, AppError> {
        *self.calls.lock().unwrap() += 1;
        match self.extracts.lock().unwrap().get(&stub.url).cloned() {
            Some(ExtractOutcome::Extract(extract)) => Ok(extract),
            Some(ExtractOutcome::Fail(message)) => Err(AppError::Navigation(message)),
            None => Err(AppError::Navigation(format!(
                "no mock extract registered for {}",
                stub.url
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// MockNlu
// ---------------------------------------------------------------------------

/// Mock NLU provider returning a fixed JSON payload or a one-shot
/// error, with a call counter for skip assertions.
#[derive(Clone)]
pub struct MockNlu {
    response: Arc<Mutex<serde_json::Value>>,
    error: Arc<Mutex<Option<AppError>>>,
    calls: Arc<Mutex<usize>>,
}

impl MockNlu {
    pub fn new(response: serde_json::Value) -> Self {
        Self {
            response: Arc::new(Mutex::new(response)),
            error: Arc::new(Mutex::new(None)),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_error(error: AppError) -> Self {
        Self {
            response: Arc::new(Mutex::new(serde_json::Value::Null)),
            error: Arc::new(Mutex::new(Some(error))),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl NluAnalyzer for MockNlu {
    async fn analyze(&self, _text: &str) -> Result<serde_json::Value, AppError> {
        *self.calls.lock().unwrap() += 1;
        if let Some(e) = self.error.lock().unwrap().take() {
            return Err(e);
        }
        Ok(self.response.lock().unwrap().clone())
    }
}

// ---------------------------------------------------------------------------
// MockVision
// ---------------------------------------------------------------------------

/// Mock vision provider, same shape as [`MockNlu`].
#[derive(Clone)]
pub struct MockVision {
    response: Arc<Mutex<VisionAnalysis>>,
    error: Arc<Mutex<Option<AppError>>>,
    calls: Arc<Mutex<usize>>,
}

impl MockVision {
    pub fn new(response: VisionAnalysis) -> Self {
        Self {
            response: Arc::new(Mutex::new(response)),
            error: Arc::new(Mutex::new(None)),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_error(error: AppError) -> Self {
        Self {
            response: Arc::new(Mutex::new(VisionAnalysis {
                description: String::new(),
                description_confidence: 0.0,
                tags: Vec::new(),
            })),
            error: Arc::new(Mutex::new(Some(error))),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl VisionAnalyzer for MockVision {
    async fn analyze_image(&self, _image_url: &str) -> Result<VisionAnalysis, AppError> {
        *self.calls.lock().unwrap() += 1;
        if let Some(e) = self.error.lock().unwrap().take() {
            return Err(e);
        }
        Ok(self.response.lock().unwrap().clone())
    }
}

// ---------------------------------------------------------------------------
// MockClassifier
// ---------------------------------------------------------------------------

/// Mock sentiment classifier returning the same raw reply for every
/// comment, or a one-shot error.
#[derive(Clone)]
pub struct MockClassifier {
    reply: Arc<Mutex<String>>,
    error: Arc<Mutex<Option<AppError>>>,
}

impl MockClassifier {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: Arc::new(Mutex::new(reply.to_string())),
            error: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_error(error: AppError) -> Self {
        Self {
            reply: Arc::new(Mutex::new(String::new())),
            error: Arc::new(Mutex::new(Some(error))),
        }
    }
}

impl SentimentClassifier for MockClassifier {
    async fn classify(&self, _text: &str) -> Result<String, AppError> {
        if let Some(e) = self.error.lock().unwrap().take() {
            return Err(e);
        }
        Ok(self.reply.lock().unwrap().clone())
    }
}

// ---------------------------------------------------------------------------
// MockSink
// ---------------------------------------------------------------------------

/// Mock sink that records delivered records and can fail on demand.
#[derive(Clone, Default)]
pub struct MockSink {
    delivered: Arc<Mutex<Vec<ArticleRecord>>>,
    error: Arc<Mutex<Option<AppError>>>,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_error(error: AppError) -> Self {
        Self {
            delivered: Arc::new(Mutex::new(Vec::new())),
            error: Arc::new(Mutex::new(Some(error))),
        }
    }

    pub fn delivered(&self) -> Vec<ArticleRecord> {
        self.delivered.lock().unwrap().clone()
    }
}

impl RecordSink for MockSink {
    async fn deliver(&self, record: &ArticleRecord) -> Result<(), AppError> {
        if let Some(e) = self.error.lock().unwrap().take() {
            return Err(e);
        }
        self.delivered.lock().unwrap().push(record.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockQueue
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum EntryStatus {
    Available,
    Locked(String),
    Dead,
}

#[derive(Debug, Clone)]
struct QueueEntry {
    message: QueuedMessage,
    status: EntryStatus,
}

/// In-memory queue honoring the [`MessageQueue`] contract, including
/// delivery counting and dead-lettering. Can be told to fail the
/// first N publishes with a retryable error.
#[derive(Clone)]
pub struct MockQueue {
    entries: Arc<Mutex<Vec<QueueEntry>>>,
    policy: DeliveryPolicy,
    publish_failures: Arc<Mutex<u32>>,
    publish_calls: Arc<Mutex<usize>>,
}

impl MockQueue {
    pub fn new() -> Self {
        Self::with_policy(DeliveryPolicy::default())
    }

    pub fn with_policy(policy: DeliveryPolicy) -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
            policy,
            publish_failures: Arc::new(Mutex::new(0)),
            publish_calls: Arc::new(Mutex::new(0)),
        }
    }

    /// Fail the next `n` publish calls with a retryable error.
    pub fn with_publish_failures(n: u32) -> Self {
        let queue = Self::new();
        *queue.publish_failures.lock().unwrap() = n;
        queue
    }

    pub fn publish_calls(&self) -> usize {
        *self.publish_calls.lock().unwrap()
    }
}

impl Default for MockQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageQueue for MockQueue {
    async fn publish(&self, payload: &serde_json::Value) -> Result<Uuid, AppError> {
        *self.publish_calls.lock().unwrap() += 1;
        {
            let mut failures = self.publish_failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(AppError::Publish("connection reset by broker".to_string()));
            }
        }
        let id = Uuid::new_v4();
        self.entries.lock().unwrap().push(QueueEntry {
            message: QueuedMessage {
                id,
                payload: payload.clone(),
                delivery_count: 0,
                enqueued_at: Utc::now(),
            },
            status: EntryStatus::Available,
        });
        Ok(id)
    }

    async fn receive(&self, consumer_id: &str) -> Result<Option<QueuedMessage>, AppError> {
        let mut entries = self.entries.lock().unwrap();
        for entry in entries.iter_mut() {
            if entry.status == EntryStatus::Available {
                entry.status = EntryStatus::Locked(consumer_id.to_string());
                entry.message.delivery_count += 1;
                return Ok(Some(entry.message.clone()));
            }
        }
        Ok(None)
    }

    async fn complete(&self, message_id: Uuid) -> Result<(), AppError> {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|e| e.message.id != message_id);
        if entries.len() == before {
            return Err(AppError::MalformedMessage(format!(
                "unknown message {message_id}"
            )));
        }
        Ok(())
    }

    async fn abandon(&self, message_id: Uuid, _reason: &str) -> Result<AbandonOutcome, AppError> {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries
            .iter_mut()
            .find(|e| e.message.id == message_id)
            .ok_or_else(|| AppError::MalformedMessage(format!("unknown message {message_id}")))?;
        if entry.message.delivery_count >= self.policy.max_deliveries {
            entry.status = EntryStatus::Dead;
            Ok(AbandonOutcome::DeadLettered)
        } else {
            entry.status = EntryStatus::Available;
            Ok(AbandonOutcome::Requeued)
        }
    }

    async fn release_consumer_messages(&self, consumer_id: &str) -> Result<u64, AppError> {
        let mut entries = self.entries.lock().unwrap();
        let mut released = 0;
        for entry in entries.iter_mut() {
            if entry.status == EntryStatus::Locked(consumer_id.to_string()) {
                entry.status = EntryStatus::Available;
                // A delivery that was never attempted does not count
                // against the dead-letter cap.
                entry.message.delivery_count = entry.message.delivery_count.saturating_sub(1);
                released += 1;
            }
        }
        Ok(released)
    }

    async fn count_available(&self) -> Result<i64, AppError> {
        let entries = self.entries.lock().unwrap();
        Ok(entries
            .iter()
            .filter(|e| e.status == EntryStatus::Available)
            .count() as i64)
    }

    async fn count_dead_lettered(&self) -> Result<i64, AppError> {
        let entries = self.entries.lock().unwrap();
        Ok(entries
            .iter()
            .filter(|e| e.status == EntryStatus::Dead)
            .count() as i64)
    }
}

// ---------------------------------------------------------------------------
// MockArticleStore
// ---------------------------------------------------------------------------

/// Recorded upsert: (site, record).
pub type UpsertRecord = (String, ArticleRecord);

/// Mock store that records upserts and can fail the first N calls.
#[derive(Clone, Default)]
pub struct MockArticleStore {
    pub upserts: Arc<Mutex<Vec<UpsertRecord>>>,
    failures: Arc<Mutex<u32>>,
}

impl MockArticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the first `n` upsert calls with a database error.
    pub fn with_failures(n: u32) -> Self {
        let store = Self::new();
        *store.failures.lock().unwrap() = n;
        store
    }

    pub fn upserts(&self) -> Vec<UpsertRecord> {
        self.upserts.lock().unwrap().clone()
    }
}

impl ArticleStore for MockArticleStore {
    async fn upsert(&self, site: &str, record: &ArticleRecord) -> Result<Uuid, AppError> {
        {
            let mut failures = self.failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(AppError::Database("connection reset".to_string()));
            }
        }
        self.upserts
            .lock()
            .unwrap()
            .push((site.to_string(), record.clone()));
        Ok(Uuid::new_v4())
    }
}
