//! Discord surface against a mocked REST API

mod helpers;

use assert_matches::assert_matches;
use helpers::*;
use serial_test::serial;
use GatherBuddy::services::dashboard::{finalize_on, upsert_pinned, StoredMessages};
use GatherBuddy::services::{ChatSurface, DiscordSurface, SurfaceError};

fn surface(mock: &DiscordMockServer) -> DiscordSurface {
    let settings = test_settings("http://127.0.0.1:9", Some(&mock.api_url()));
    let config = settings.discord.expect("discord configured");
    DiscordSurface::new(&config).expect("Failed to build Discord surface")
}

#[tokio::test]
#[serial]
async fn test_send_returns_message_id() {
    let mock = DiscordMockServer::new().await;
    mock.mock_create_message(Some(1)).await;

    let id = surface(&mock).send(TEST_DISCORD_CHANNEL, "hello").await.unwrap();

    assert_eq!(id, DISCORD_MESSAGE_ID);
    let bodies = mock.bodies_to(&format!("/channels/{}/messages", TEST_DISCORD_CHANNEL)).await;
    assert_eq!(bodies[0]["content"], "hello");
}

#[tokio::test]
#[serial]
async fn test_unknown_message_is_classified() {
    let mock = DiscordMockServer::new().await;
    mock.mock_edit_message(404, Some(10008)).await;

    let result = surface(&mock).edit(TEST_DISCORD_CHANNEL, "1", "text").await;

    assert_matches!(result, Err(SurfaceError::MessageNotFound));
}

#[tokio::test]
#[serial]
async fn test_missing_permission_is_classified() {
    let mock = DiscordMockServer::new().await;
    mock.mock_pin(403, Some(50013)).await;

    let result = surface(&mock).pin(TEST_DISCORD_CHANNEL, "1").await;

    assert_matches!(result, Err(SurfaceError::MissingPermission(_)));
}

#[tokio::test]
#[serial]
async fn test_vanished_dashboard_is_recreated() {
    let mock = DiscordMockServer::new().await;
    mock.mock_edit_message(404, Some(10008)).await;
    mock.mock_create_message(Some(1)).await;
    mock.mock_pin(204, None).await;

    let stored = upsert_pinned(&surface(&mock), TEST_DISCORD_CHANNEL, Some("1"), "Votes: 4").await;

    assert_eq!(stored.as_deref(), Some(DISCORD_MESSAGE_ID));
}

#[tokio::test]
#[serial]
async fn test_finalize_deletes_the_dashboard() {
    let mock = DiscordMockServer::new().await;
    mock.mock_delete_message(1).await;
    mock.mock_create_message(Some(1)).await;
    mock.mock_pin(204, None).await;

    let stored = StoredMessages { dashboard: Some("5".to_string()), announcement: None };
    let after = finalize_on(&surface(&mock), TEST_DISCORD_CHANNEL, &stored, "It's on!").await;

    assert_eq!(after.dashboard, None);
    assert_eq!(after.announcement.as_deref(), Some(DISCORD_MESSAGE_ID));
}

#[tokio::test]
#[serial]
async fn test_direct_message_opens_a_dm_channel() {
    let mock = DiscordMockServer::new().await;
    mock.mock_direct_message().await;

    let id = surface(&mock).send_direct("42", "your login link").await.unwrap();

    assert_eq!(id, "930000000000000001");
    let opened = mock.bodies_to("/users/@me/channels").await;
    assert_eq!(opened[0]["recipient_id"], "42");
}
