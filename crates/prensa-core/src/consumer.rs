use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{ConsumerConfig, ENVELOPE_SCHEMA_VERSION, Envelope};
use crate::queue::{AbandonOutcome, MessageQueue, QueuedMessage};
use crate::traits::ArticleStore;
use crate::util::collection_name_from_url;

/// Events emitted by the consumer for monitoring/logging.
#[derive(Debug, Clone)]
pub enum ConsumerEvent<'a> {
    Started {
        consumer_id: &'a str,
    },
    Polling,
    MessageReceived {
        message_id: Uuid,
        delivery_count: u32,
    },
    MessagePersisted {
        message_id: Uuid,
        document_id: Uuid,
        site: &'a str,
    },
    MessageAbandoned {
        message_id: Uuid,
        error: &'a str,
        outcome: AbandonOutcome,
    },
    ShuttingDown {
        consumer_id: &'a str,
        messages_released: u64,
    },
    Stopped {
        consumer_id: &'a str,
    },
}

/// Trait for receiving consumer events (decoupled logging).
pub trait ConsumerReporter: Send + Sync {
    fn report(&self, event: ConsumerEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingConsumerReporter;

impl ConsumerReporter for TracingConsumerReporter {
    fn report(&self, event: ConsumerEvent<'_>) {
        match event {
            ConsumerEvent::Started { consumer_id } => {
                tracing::info!(%consumer_id, "Consumer started");
            }
            ConsumerEvent::Polling => {
                tracing::debug!("Polling for messages");
            }
            ConsumerEvent::MessageReceived {
                message_id,
                delivery_count,
            } => {
                tracing::info!(%message_id, %delivery_count, "Message received");
            }
            ConsumerEvent::MessagePersisted {
                message_id,
                document_id,
                site,
            } => {
                tracing::info!(%message_id, %document_id, %site, "Message persisted");
            }
            ConsumerEvent::MessageAbandoned {
                message_id,
                error,
                outcome,
            } => match outcome {
                AbandonOutcome::Requeued => {
                    tracing::warn!(%message_id, %error, "Message abandoned; will be redelivered");
                }
                AbandonOutcome::DeadLettered => {
                    tracing::error!(%message_id, %error, "Message dead-lettered");
                }
            },
            ConsumerEvent::ShuttingDown {
                consumer_id,
                messages_released,
            } => {
                tracing::info!(%consumer_id, %messages_released, "Consumer shutting down");
            }
            ConsumerEvent::Stopped { consumer_id } => {
                tracing::info!(%consumer_id, "Consumer stopped");
            }
        }
    }
}

/// Consumer that drains the queue into the document store.
///
/// At-least-once: a message is completed only after the store has
/// acknowledged the upsert. Failures abandon the message so another
/// delivery can retry it, until the queue dead-letters it.
pub struct ConsumerService<Q, S>
where
    Q: MessageQueue,
    S: ArticleStore,
{
    queue: Q,
    store: S,
    config: ConsumerConfig,
}

impl<Q, S> ConsumerService<Q, S>
where
    Q: MessageQueue,
    S: ArticleStore,
{
    pub fn new(queue: Q, store: S, config: ConsumerConfig) -> Self {
        Self {
            queue,
            store,
            config,
        }
    }

    /// Run the consume loop until cancellation.
    pub async fn run<CR: ConsumerReporter>(
        &self,
        cancel_token: CancellationToken,
        reporter: &CR,
    ) -> Result<(), AppError> {
        reporter.report(ConsumerEvent::Started {
            consumer_id: &self.config.consumer_id,
        });

        loop {
            if cancel_token.is_cancelled() {
                break;
            }

            reporter.report(ConsumerEvent::Polling);

            match self.queue.receive(&self.config.consumer_id).await {
                Ok(Some(message)) => {
                    reporter.report(ConsumerEvent::MessageReceived {
                        message_id: message.id,
                        delivery_count: message.delivery_count,
                    });
                    self.handle(&message, reporter).await;
                }
                Ok(None) => {
                    tokio::select! {
                        () = tokio::time::sleep(self.config.poll_interval) => {}
                        () = cancel_token.cancelled() => break,
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to receive message");
                    tokio::select! {
                        () = tokio::time::sleep(self.config.poll_interval * 2) => {}
                        () = cancel_token.cancelled() => break,
                    }
                }
            }
        }

        // Graceful shutdown: release locked messages without burning
        // a delivery.
        let released = self
            .queue
            .release_consumer_messages(&self.config.consumer_id)
            .await
            .unwrap_or(0);

        reporter.report(ConsumerEvent::ShuttingDown {
            consumer_id: &self.config.consumer_id,
            messages_released: released,
        });
        reporter.report(ConsumerEvent::Stopped {
            consumer_id: &self.config.consumer_id,
        });

        Ok(())
    }

    /// Process one message. Persist-then-complete ordering is the
    /// at-least-once guarantee; everything else is error plumbing.
    async fn handle<CR: ConsumerReporter>(&self, message: &QueuedMessage, reporter: &CR) {
        match self.persist(message).await {
            Ok((document_id, site)) => {
                reporter.report(ConsumerEvent::MessagePersisted {
                    message_id: message.id,
                    document_id,
                    site: &site,
                });
                if let Err(e) = self.queue.complete(message.id).await {
                    // The upsert is idempotent, so the inevitable
                    // redelivery converges on the same document.
                    tracing::error!(message_id = %message.id, error = %e, "Failed to complete message");
                }
            }
            Err(e) => {
                let error_msg = e.to_string();
                match self.queue.abandon(message.id, &error_msg).await {
                    Ok(outcome) => {
                        reporter.report(ConsumerEvent::MessageAbandoned {
                            message_id: message.id,
                            error: &error_msg,
                            outcome,
                        });
                    }
                    Err(e) => {
                        tracing::error!(message_id = %message.id, error = %e, "Failed to abandon message");
                    }
                }
            }
        }
    }

    async fn persist(&self, message: &QueuedMessage) -> Result<(Uuid, String), AppError> {
        let envelope: Envelope = serde_json::from_value(message.payload.clone())
            .map_err(|e| AppError::MalformedMessage(format!("undecodable envelope: {e}")))?;

        if envelope.schema_version != ENVELOPE_SCHEMA_VERSION {
            return Err(AppError::MalformedMessage(format!(
                "unsupported schema version {}",
                envelope.schema_version
            )));
        }

        let site = collection_name_from_url(&envelope.record.canonical_url)
            .map_err(|e| AppError::MalformedMessage(format!("bad canonical URL: {e}")))?;

        let document_id = self.store.upsert(&site, &envelope.record).await?;
        Ok((document_id, site))
    }
}
