//! Queue-backed delivery target: wraps each record in a versioned
//! envelope and publishes it with bounded retries.

use std::time::Duration;

use crate::error::AppError;
use crate::models::{ArticleRecord, Envelope};
use crate::queue::MessageQueue;
use crate::traits::RecordSink;

/// Retry policy for publishes. Transient broker errors are retried
/// with doubling backoff; anything else fails immediately.
#[derive(Debug, Clone)]
pub struct PublishRetry {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for PublishRetry {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

/// Delivers finished records to the durable queue. Publish only waits
/// for the queue to accept the message, never for a consumer.
#[derive(Clone)]
pub struct QueuePublisher<Q: MessageQueue> {
    queue: Q,
    retry: PublishRetry,
}

impl<Q: MessageQueue> QueuePublisher<Q> {
    pub fn new(queue: Q) -> Self {
        Self {
            queue,
            retry: PublishRetry::default(),
        }
    }

    pub fn with_retry(queue: Q, retry: PublishRetry) -> Self {
        Self { queue, retry }
    }

    async fn publish_with_retry(&self, payload: &serde_json::Value) -> Result<(), AppError> {
        let mut backoff = self.retry.initial_backoff;
        let mut attempt = 1;
        loop {
            match self.queue.publish(payload).await {
                Ok(id) => {
                    tracing::debug!(message_id = %id, attempt, "Record published");
                    return Ok(());
                }
                Err(e) if e.is_retryable() && attempt < self.retry.max_attempts => {
                    tracing::warn!(attempt, error = %e, "Publish failed; retrying");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl<Q: MessageQueue> RecordSink for QueuePublisher<Q> {
    async fn deliver(&self, record: &ArticleRecord) -> Result<(), AppError> {
        let envelope = Envelope::new(record.clone());
        let payload = serde_json::to_value(&envelope)?;
        self.publish_with_retry(&payload).await.map_err(|e| {
            AppError::Publish(format!(
                "giving up on {} after {} attempts: {e}",
                record.canonical_url, self.retry.max_attempts
            ))
        })
    }
}
