//! Webhook queue delivery against a real database and a mocked subscriber

mod helpers;

use assert_matches::assert_matches;
use helpers::*;
use serde_json::json;
use serial_test::serial;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use GatherBuddy::config::WebhookConfig;
use GatherBuddy::database::DatabaseService;
use GatherBuddy::models::WebhookStatus;
use GatherBuddy::services::{DeliveryOutcome, WebhookService};

async fn queued_row(db: &TestDatabase, subscriber: &MockServer) -> (DatabaseService, i64) {
    let telegram = TelegramMockServer::new().await;
    let services = build_services(test_settings(&telegram.api_url(), None), db.pool.clone());
    let created = services
        .scheduling_service
        .create_event(sample_event_request(2, None))
        .await
        .expect("Failed to create event");
    let event = services.database.require_event(&created.slug).await.unwrap();

    let mut conn = db.pool.acquire().await.unwrap();
    let row = services
        .database
        .webhooks
        .enqueue(
            &mut conn,
            event.id,
            &format!("{}/hook", subscriber.uri()),
            json!({ "type": "CREATED", "slug": created.slug }),
        )
        .await
        .unwrap();
    (services.database.clone(), row.id)
}

fn config(max_attempts: i32) -> WebhookConfig {
    WebhookConfig {
        max_attempts,
        base_backoff_seconds: 30,
        timeout_seconds: 5,
        sweep_interval_seconds: 60,
    }
}

#[tokio::test]
#[serial]
async fn test_delivery_happens_once() {
    let Some(db) = TestDatabase::try_new().await else { return };
    let subscriber = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&subscriber)
        .await;

    let (database, id) = queued_row(&db, &subscriber).await;
    let service = WebhookService::new(database.clone(), config(5)).unwrap();

    assert_eq!(service.deliver(id).await.unwrap(), DeliveryOutcome::Sent);
    assert_eq!(service.deliver(id).await.unwrap(), DeliveryOutcome::Skipped);

    let row = database.webhooks.find(id).await.unwrap().unwrap();
    assert_eq!(row.status, WebhookStatus::Sent);
    assert!(row.sent_at.is_some());
}

#[tokio::test]
#[serial]
async fn test_failure_backs_off_then_parks() {
    let Some(db) = TestDatabase::try_new().await else { return };
    let subscriber = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&subscriber)
        .await;

    let (database, id) = queued_row(&db, &subscriber).await;
    let service = WebhookService::new(database.clone(), config(2)).unwrap();

    assert_eq!(service.deliver(id).await.unwrap(), DeliveryOutcome::Retrying);
    let row = database.webhooks.find(id).await.unwrap().unwrap();
    assert_eq!(row.status, WebhookStatus::Pending);
    assert_eq!(row.attempts, 1);
    assert!(row.next_attempt > chrono::Utc::now());
    assert_matches!(row.last_error.as_deref(), Some(e) if e.contains("500"));

    // Not due yet, so neither a direct call nor a sweep posts again
    assert_eq!(service.deliver(id).await.unwrap(), DeliveryOutcome::Skipped);
    assert_eq!(service.process_due().await.unwrap(), 0);

    sqlx::query("UPDATE webhook_events SET next_attempt = NOW() - INTERVAL '1 second' WHERE id = $1")
        .bind(id)
        .execute(&db.pool)
        .await
        .unwrap();
    assert_eq!(service.deliver(id).await.unwrap(), DeliveryOutcome::Failed);

    let row = database.webhooks.find(id).await.unwrap().unwrap();
    assert_eq!(row.status, WebhookStatus::Failed);
    assert_eq!(row.attempts, 2);
}

#[tokio::test]
#[serial]
async fn test_event_without_subscriber_queues_nothing() {
    let Some(db) = TestDatabase::try_new().await else { return };
    let telegram = TelegramMockServer::new().await;
    let services = build_services(test_settings(&telegram.api_url(), None), db.pool.clone());

    services
        .scheduling_service
        .create_event(sample_event_request(2, None))
        .await
        .unwrap();

    assert_eq!(db.count_rows("webhook_events").await, 0);
}

#[tokio::test]
#[serial]
async fn test_create_with_subscriber_posts_created_payload() {
    let Some(db) = TestDatabase::try_new().await else { return };
    let telegram = TelegramMockServer::new().await;
    let subscriber = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&subscriber)
        .await;

    let services = build_services(test_settings(&telegram.api_url(), None), db.pool.clone());
    let mut request = sample_event_request(2, None);
    request.webhook_url = Some(format!("{}/hook", subscriber.uri()));
    request.from_url_id = Some("sub-42".to_string());
    let created = services.scheduling_service.create_event(request).await.unwrap();

    // Delivery runs in the background after commit
    let mut delivered = Vec::new();
    for _ in 0..50 {
        delivered = subscriber.received_requests().await.unwrap_or_default();
        if !delivered.is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }

    let payload: serde_json::Value = serde_json::from_slice(&delivered[0].body).unwrap();
    assert_eq!(payload["type"], "CREATED");
    assert_eq!(payload["slug"], created.slug);
    assert_eq!(payload["fromUrlId"], "sub-42");
}
