use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppError;

/// What happened to a message after `abandon`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbandonOutcome {
    /// Returned to the queue for redelivery.
    Requeued,
    /// Delivery cap reached; parked for offline inspection.
    DeadLettered,
}

/// Redelivery policy for the queue. A message abandoned after
/// `max_deliveries` receives is dead-lettered instead of requeued,
/// so a poison message cannot loop forever.
#[derive(Debug, Clone)]
pub struct DeliveryPolicy {
    pub max_deliveries: u32,
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self { max_deliveries: 5 }
    }
}

/// A message claimed from the queue, locked for one consumer.
#[derive(Debug, Clone)]
pub struct QueuedMessage {
    pub id: Uuid,
    pub payload: serde_json::Value,
    /// Number of times this message has been received, this delivery
    /// included.
    pub delivery_count: u32,
    pub enqueued_at: DateTime<Utc>,
}

/// Durable queue with at-least-once delivery.
///
/// Implementations must claim atomically (`SELECT FOR UPDATE SKIP
/// LOCKED` or equivalent) so two consumers never hold the same
/// message, and must keep a message until it is explicitly completed.
pub trait MessageQueue: Send + Sync + Clone {
    /// Enqueue a payload. Returns the message id once the queue has
    /// accepted it; consumer acknowledgment is not awaited.
    fn publish(
        &self,
        payload: &serde_json::Value,
    ) -> impl Future<Output = Result<Uuid, AppError>> + Send;

    /// Claim the next available message, incrementing its delivery
    /// count. Returns `None` when the queue is empty.
    fn receive(
        &self,
        consumer_id: &str,
    ) -> impl Future<Output = Result<Option<QueuedMessage>, AppError>> + Send;

    /// Acknowledge a message: remove it permanently.
    fn complete(&self, message_id: Uuid) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Return a message to the queue for redelivery, or dead-letter
    /// it when the delivery cap is reached.
    fn abandon(
        &self,
        message_id: Uuid,
        reason: &str,
    ) -> impl Future<Output = Result<AbandonOutcome, AppError>> + Send;

    /// Release all messages locked by a consumer (graceful shutdown).
    /// Released messages become available again without counting an
    /// extra delivery.
    fn release_consumer_messages(
        &self,
        consumer_id: &str,
    ) -> impl Future<Output = Result<u64, AppError>> + Send;

    fn count_available(&self) -> impl Future<Output = Result<i64, AppError>> + Send;

    fn count_dead_lettered(&self) -> impl Future<Output = Result<i64, AppError>> + Send;
}
