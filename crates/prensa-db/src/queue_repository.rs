use chrono::{DateTime, Utc};
use sqlx::{PgPool, Pool, Postgres};
use uuid::Uuid;

use prensa_core::error::AppError;
use prensa_core::queue::{AbandonOutcome, DeliveryPolicy, MessageQueue, QueuedMessage};

/// PostgreSQL-backed message queue using `SELECT FOR UPDATE SKIP
/// LOCKED`, so concurrent consumers never claim the same message.
#[derive(Clone)]
pub struct QueueRepository {
    pool: Pool<Postgres>,
    policy: DeliveryPolicy,
}

impl QueueRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            policy: DeliveryPolicy::default(),
        }
    }

    pub fn with_policy(pool: PgPool, policy: DeliveryPolicy) -> Self {
        Self { pool, policy }
    }
}

#[derive(sqlx::FromRow)]
struct QueueMessageRow {
    id: Uuid,
    payload: serde_json::Value,
    delivery_count: i32,
    enqueued_at: DateTime<Utc>,
}

impl From<QueueMessageRow> for QueuedMessage {
    fn from(row: QueueMessageRow) -> Self {
        QueuedMessage {
            id: row.id,
            payload: row.payload,
            delivery_count: row.delivery_count.max(0) as u32,
            enqueued_at: row.enqueued_at,
        }
    }
}

impl MessageQueue for QueueRepository {
    async fn publish(&self, payload: &serde_json::Value) -> Result<Uuid, AppError> {
        let (id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO queue_messages (payload)
            VALUES ($1)
            RETURNING id
            "#,
        )
        .bind(payload)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Publish(e.to_string()))?;

        Ok(id)
    }

    async fn receive(&self, consumer_id: &str) -> Result<Option<QueuedMessage>, AppError> {
        let row = sqlx::query_as::<_, QueueMessageRow>(
            r#"
            UPDATE queue_messages
            SET status = 'locked', locked_by = $1, locked_at = NOW(),
                delivery_count = delivery_count + 1
            WHERE id = (
                SELECT id FROM queue_messages
                WHERE status = 'available'
                ORDER BY enqueued_at ASC
                FOR UPDATE SKIP LOCKED
                LIMIT 1
            )
            RETURNING id, payload, delivery_count, enqueued_at
            "#,
        )
        .bind(consumer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(row.map(Into::into))
    }

    async fn complete(&self, message_id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM queue_messages WHERE id = $1")
            .bind(message_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AppError::Database(format!(
                "complete: unknown message {message_id}"
            )));
        }
        Ok(())
    }

    async fn abandon(&self, message_id: Uuid, reason: &str) -> Result<AbandonOutcome, AppError> {
        let (status,): (String,) = sqlx::query_as(
            r#"
            UPDATE queue_messages
            SET status = CASE WHEN delivery_count >= $2 THEN 'dead' ELSE 'available' END,
                locked_by = NULL, locked_at = NULL, last_error = $3
            WHERE id = $1
            RETURNING status
            "#,
        )
        .bind(message_id)
        .bind(self.policy.max_deliveries as i32)
        .bind(reason)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        if status == "dead" {
            Ok(AbandonOutcome::DeadLettered)
        } else {
            Ok(AbandonOutcome::Requeued)
        }
    }

    async fn release_consumer_messages(&self, consumer_id: &str) -> Result<u64, AppError> {
        // The delivery was never attempted, so it doesn't count
        // against the dead-letter cap.
        let result = sqlx::query(
            r#"
            UPDATE queue_messages
            SET status = 'available', locked_by = NULL, locked_at = NULL,
                delivery_count = GREATEST(delivery_count - 1, 0)
            WHERE locked_by = $1 AND status = 'locked'
            "#,
        )
        .bind(consumer_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn count_available(&self) -> Result<i64, AppError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM queue_messages WHERE status = 'available'")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count)
    }

    async fn count_dead_lettered(&self) -> Result<i64, AppError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM queue_messages WHERE status = 'dead'")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count)
    }
}
