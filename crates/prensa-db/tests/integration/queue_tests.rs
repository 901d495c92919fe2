use prensa_core::queue::{AbandonOutcome, DeliveryPolicy, MessageQueue};
use prensa_db::QueueRepository;

use crate::common::setup_test_db;

fn payload(n: u32) -> serde_json::Value {
    serde_json::json!({"schema_version": 1, "record": {"canonical_url": format!("https://example.com/{n}.html")}})
}

#[tokio::test]
async fn publish_then_receive_round_trips_the_payload() {
    let (pool, _container) = setup_test_db().await;
    let queue = QueueRepository::new(pool);

    let id = queue.publish(&payload(1)).await.unwrap();
    assert_eq!(queue.count_available().await.unwrap(), 1);

    let message = queue
        .receive("consumer-1")
        .await
        .unwrap()
        .expect("Should receive the published message");

    assert_eq!(message.id, id);
    assert_eq!(message.payload, payload(1));
    assert_eq!(message.delivery_count, 1);
}

#[tokio::test]
async fn locked_messages_are_invisible_to_other_consumers() {
    let (pool, _container) = setup_test_db().await;
    let queue = QueueRepository::new(pool);

    queue.publish(&payload(1)).await.unwrap();
    let first = queue.receive("consumer-1").await.unwrap();
    assert!(first.is_some());

    let second = queue.receive("consumer-2").await.unwrap();
    assert!(second.is_none());
}

#[tokio::test]
async fn messages_are_received_in_enqueue_order() {
    let (pool, _container) = setup_test_db().await;
    let queue = QueueRepository::new(pool);

    let first = queue.publish(&payload(1)).await.unwrap();
    let second = queue.publish(&payload(2)).await.unwrap();

    assert_eq!(queue.receive("c").await.unwrap().unwrap().id, first);
    assert_eq!(queue.receive("c").await.unwrap().unwrap().id, second);
}

#[tokio::test]
async fn complete_removes_the_message_permanently() {
    let (pool, _container) = setup_test_db().await;
    let queue = QueueRepository::new(pool);

    queue.publish(&payload(1)).await.unwrap();
    let message = queue.receive("consumer-1").await.unwrap().unwrap();
    queue.complete(message.id).await.unwrap();

    assert_eq!(queue.count_available().await.unwrap(), 0);
    assert!(queue.receive("consumer-1").await.unwrap().is_none());

    // Completing twice is an error: the message is gone.
    assert!(queue.complete(message.id).await.is_err());
}

#[tokio::test]
async fn abandoned_message_is_redelivered_with_higher_count() {
    let (pool, _container) = setup_test_db().await;
    let queue = QueueRepository::new(pool);

    queue.publish(&payload(1)).await.unwrap();
    let message = queue.receive("consumer-1").await.unwrap().unwrap();

    let outcome = queue.abandon(message.id, "store unavailable").await.unwrap();
    assert_eq!(outcome, AbandonOutcome::Requeued);

    let redelivered = queue.receive("consumer-1").await.unwrap().unwrap();
    assert_eq!(redelivered.id, message.id);
    assert_eq!(redelivered.delivery_count, 2);
}

#[tokio::test]
async fn poison_message_is_dead_lettered_at_the_cap() {
    let (pool, _container) = setup_test_db().await;
    let queue = QueueRepository::with_policy(pool, DeliveryPolicy { max_deliveries: 3 });

    queue.publish(&payload(1)).await.unwrap();

    for attempt in 1..=2 {
        let message = queue.receive("consumer-1").await.unwrap().unwrap();
        assert_eq!(message.delivery_count, attempt);
        assert_eq!(
            queue.abandon(message.id, "boom").await.unwrap(),
            AbandonOutcome::Requeued
        );
    }

    let message = queue.receive("consumer-1").await.unwrap().unwrap();
    assert_eq!(message.delivery_count, 3);
    assert_eq!(
        queue.abandon(message.id, "boom").await.unwrap(),
        AbandonOutcome::DeadLettered
    );

    assert_eq!(queue.count_available().await.unwrap(), 0);
    assert_eq!(queue.count_dead_lettered().await.unwrap(), 1);
    assert!(queue.receive("consumer-1").await.unwrap().is_none());
}

#[tokio::test]
async fn release_returns_locked_messages_without_burning_a_delivery() {
    let (pool, _container) = setup_test_db().await;
    let queue = QueueRepository::new(pool);

    queue.publish(&payload(1)).await.unwrap();
    queue.publish(&payload(2)).await.unwrap();
    queue.receive("consumer-1").await.unwrap().unwrap();
    queue.receive("consumer-1").await.unwrap().unwrap();
    assert_eq!(queue.count_available().await.unwrap(), 0);

    let released = queue.release_consumer_messages("consumer-1").await.unwrap();
    assert_eq!(released, 2);
    assert_eq!(queue.count_available().await.unwrap(), 2);

    // Delivery count is back to what it was before the claim.
    let message = queue.receive("consumer-2").await.unwrap().unwrap();
    assert_eq!(message.delivery_count, 1);
}

#[tokio::test]
async fn release_only_touches_the_named_consumer() {
    let (pool, _container) = setup_test_db().await;
    let queue = QueueRepository::new(pool);

    queue.publish(&payload(1)).await.unwrap();
    queue.receive("consumer-1").await.unwrap().unwrap();

    let released = queue.release_consumer_messages("consumer-2").await.unwrap();
    assert_eq!(released, 0);
    assert_eq!(queue.count_available().await.unwrap(), 0);
}
