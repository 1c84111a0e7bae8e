//! Mock Discord REST API for testing

use serde_json::{json, Value};
use wiremock::{
    matchers::{method, path, path_regex},
    Mock, MockServer, ResponseTemplate,
};

pub const TEST_DISCORD_CHANNEL: &str = "900000000000000001";
pub const DISCORD_MESSAGE_ID: &str = "910000000000000001";
pub const DISCORD_DM_CHANNEL: &str = "920000000000000001";

/// Mock Discord API server for testing
pub struct DiscordMockServer {
    pub server: MockServer,
}

impl DiscordMockServer {
    pub async fn new() -> Self {
        Self { server: MockServer::start().await }
    }

    pub fn api_url(&self) -> String {
        self.server.uri()
    }

    /// Message creation in the test channel
    pub async fn mock_create_message(&self, expected_calls: Option<u64>) {
        let mut mock = Mock::given(method("POST"))
            .and(path(format!("/channels/{}/messages", TEST_DISCORD_CHANNEL)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": DISCORD_MESSAGE_ID,
                "channel_id": TEST_DISCORD_CHANNEL,
                "content": "dashboard"
            })));
        if let Some(calls) = expected_calls {
            mock = mock.expect(calls);
        }
        mock.mount(&self.server).await;
    }

    /// Message creation that answers only after `delay`
    pub async fn mock_slow_create_message(&self, delay: std::time::Duration) {
        Mock::given(method("POST"))
            .and(path(format!("/channels/{}/messages", TEST_DISCORD_CHANNEL)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "id": DISCORD_MESSAGE_ID, "channel_id": TEST_DISCORD_CHANNEL }))
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
    }

    /// Message edit answering with an HTTP status and Discord error code
    pub async fn mock_edit_message(&self, status: u16, code: Option<i64>) {
        let body = match code {
            Some(code) => json!({ "code": code, "message": "error" }),
            None => json!({ "id": DISCORD_MESSAGE_ID }),
        };
        Mock::given(method("PATCH"))
            .and(path_regex(format!(r"^/channels/{}/messages/\d+$", TEST_DISCORD_CHANNEL)))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Pin answering with an HTTP status and Discord error code
    pub async fn mock_pin(&self, status: u16, code: Option<i64>) {
        let template = match code {
            Some(code) => ResponseTemplate::new(status).set_body_json(json!({ "code": code, "message": "Missing Permissions" })),
            None => ResponseTemplate::new(status),
        };
        Mock::given(method("PUT"))
            .and(path_regex(format!(r"^/channels/{}/pins/\d+$", TEST_DISCORD_CHANNEL)))
            .respond_with(template)
            .mount(&self.server)
            .await;
    }

    pub async fn mock_delete_message(&self, expected_calls: u64) {
        Mock::given(method("DELETE"))
            .and(path_regex(format!(r"^/channels/{}/messages/\d+$", TEST_DISCORD_CHANNEL)))
            .respond_with(ResponseTemplate::new(204))
            .expect(expected_calls)
            .mount(&self.server)
            .await;
    }

    /// DM channel creation followed by the message into it
    pub async fn mock_direct_message(&self) {
        Mock::given(method("POST"))
            .and(path("/users/@me/channels"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": DISCORD_DM_CHANNEL, "type": 1 })))
            .mount(&self.server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("/channels/{}/messages", DISCORD_DM_CHANNEL)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "930000000000000001" })))
            .mount(&self.server)
            .await;
    }

    /// JSON bodies of every request to a path
    pub async fn bodies_to(&self, wanted: &str) -> Vec<Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path() == wanted)
            .filter_map(|request| serde_json::from_slice(&request.body).ok())
            .collect()
    }
}
