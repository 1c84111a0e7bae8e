//! Dashboard lifecycle against a mocked Telegram Bot API

mod helpers;

use helpers::*;
use serial_test::serial;
use GatherBuddy::services::dashboard::{cancel_on, finalize_on, upsert_pinned, StoredMessages};
use GatherBuddy::services::notification::render_pin_permission_warning;
use GatherBuddy::services::TelegramSurface;

fn surface(mock: &TelegramMockServer) -> TelegramSurface {
    let settings = test_settings(&mock.api_url(), None);
    let bot = TelegramSurface::build_bot(&settings.telegram).expect("Failed to build bot");
    TelegramSurface::new(bot, &settings.telegram)
}

fn chat() -> String {
    TEST_GROUP_CHAT_ID.to_string()
}

#[tokio::test]
#[serial]
async fn test_first_sync_sends_and_pins() {
    let mock = TelegramMockServer::new().await;
    mock.mock_send_message(MockResponseConfig::default().times(1)).await;
    mock.mock_pin_chat_message(MockResponseConfig::default().times(1)).await;

    let stored = upsert_pinned(&surface(&mock), &chat(), None, "Votes: 0").await;

    assert_eq!(stored, Some(SENT_MESSAGE_ID.to_string()));
    assert_eq!(mock.sent_texts().await, vec!["Votes: 0".to_string()]);
}

#[tokio::test]
#[serial]
async fn test_later_syncs_edit_in_place() {
    let mock = TelegramMockServer::new().await;
    mock.mock_send_message(MockResponseConfig::default().times(0)).await;
    mock.mock_edit_message_text(MockResponseConfig::default().times(2)).await;

    let surface = surface(&mock);
    let first = upsert_pinned(&surface, &chat(), Some("77"), "Votes: 1").await;
    let second = upsert_pinned(&surface, &chat(), first.as_deref(), "Votes: 2").await;

    assert_eq!(first.as_deref(), Some("77"));
    assert_eq!(second.as_deref(), Some("77"));

    let edits = mock.requests_to("editMessageText").await;
    assert_eq!(edits[1]["message_id"], 77);
    assert_eq!(edits[1]["text"], "Votes: 2");
}

#[tokio::test]
#[serial]
async fn test_not_modified_keeps_the_message() {
    let mock = TelegramMockServer::new().await;
    mock.mock_edit_message_text(MockResponseConfig::failing(NOT_MODIFIED)).await;
    mock.mock_send_message(MockResponseConfig::default().times(0)).await;

    let stored = upsert_pinned(&surface(&mock), &chat(), Some("77"), "same text").await;

    assert_eq!(stored.as_deref(), Some("77"));
}

#[tokio::test]
#[serial]
async fn test_vanished_message_is_resent_and_pinned() {
    let mock = TelegramMockServer::new().await;
    mock.mock_edit_message_text(MockResponseConfig::failing(MESSAGE_TO_EDIT_NOT_FOUND)).await;
    mock.mock_send_message(MockResponseConfig::default().times(1)).await;
    mock.mock_pin_chat_message(MockResponseConfig::default().times(1)).await;

    let stored = upsert_pinned(&surface(&mock), &chat(), Some("77"), "Votes: 3").await;

    assert_eq!(stored, Some(SENT_MESSAGE_ID.to_string()));
}

#[tokio::test]
#[serial]
async fn test_pin_without_rights_posts_a_warning() {
    let mock = TelegramMockServer::new().await;
    mock.mock_send_message(MockResponseConfig::default().times(2)).await;
    mock.mock_pin_chat_message(MockResponseConfig::failing(NOT_ENOUGH_RIGHTS_TO_PIN)).await;

    let stored = upsert_pinned(&surface(&mock), &chat(), None, "Votes: 0").await;

    // The dashboard is still tracked so later syncs edit it
    assert_eq!(stored, Some(SENT_MESSAGE_ID.to_string()));
    assert_eq!(
        mock.sent_texts().await,
        vec!["Votes: 0".to_string(), render_pin_permission_warning()]
    );
}

#[tokio::test]
#[serial]
async fn test_finalize_unpins_dashboard_and_pins_announcement() {
    let mock = TelegramMockServer::new().await;
    mock.mock_unpin_chat_message(MockResponseConfig::default().times(1)).await;
    mock.mock_delete_message(MockResponseConfig::default().times(0)).await;
    mock.mock_send_message(MockResponseConfig::default().times(1)).await;
    mock.mock_pin_chat_message(MockResponseConfig::default().times(1)).await;

    let stored = StoredMessages { dashboard: Some("77".to_string()), announcement: None };
    let after = finalize_on(&surface(&mock), &chat(), &stored, "It's on!").await;

    assert_eq!(
        after,
        StoredMessages { dashboard: None, announcement: Some(SENT_MESSAGE_ID.to_string()) }
    );
    let unpins = mock.requests_to("unpinChatMessage").await;
    assert_eq!(unpins[0]["message_id"], 77);
}

#[tokio::test]
#[serial]
async fn test_cancel_edits_pinned_and_sends_notice() {
    let mock = TelegramMockServer::new().await;
    mock.mock_edit_message_text(MockResponseConfig::failing(MESSAGE_TO_EDIT_NOT_FOUND).times(1)).await;
    mock.mock_send_message(MockResponseConfig::default().times(1)).await;

    let stored = StoredMessages { dashboard: None, announcement: Some("88".to_string()) };
    cancel_on(&surface(&mock), &chat(), &stored, "CANCELLED", "The event was cancelled").await;

    assert_eq!(mock.sent_texts().await, vec!["The event was cancelled".to_string()]);
}
