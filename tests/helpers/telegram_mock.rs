//! Mock Telegram API Server for testing
//!
//! Simulates the Bot API methods the dashboard and DM paths call. Responses
//! are configured per method, including the error descriptions the surface
//! classifies.

use serde_json::{json, Value};
use wiremock::{
    matchers::{method, path_regex},
    Mock, MockServer, ResponseTemplate,
};

/// Bot token every test bot uses
pub const TEST_BOT_TOKEN: &str = "12345:test_token";

/// Group chat the mocks answer for
pub const TEST_GROUP_CHAT_ID: i64 = -1001234567890;

/// Message id returned by a successful `sendMessage`
pub const SENT_MESSAGE_ID: i32 = 123;

/// Bot API error descriptions
pub const NOT_MODIFIED: &str =
    "Bad Request: message is not modified: specified new message content and reply markup are exactly the same as a current content and reply markup of the message";
pub const MESSAGE_TO_EDIT_NOT_FOUND: &str = "Bad Request: message to edit not found";
pub const NOT_ENOUGH_RIGHTS_TO_PIN: &str = "Bad Request: not enough rights to pin a message";

/// Mock Telegram API server for testing
pub struct TelegramMockServer {
    pub server: MockServer,
}

/// Configuration for a mocked method
#[derive(Debug, Clone)]
pub struct MockResponseConfig {
    pub success: bool,
    /// Error description returned when `success` is false
    pub description: Option<&'static str>,
    /// Exact number of calls the mock must see
    pub expected_calls: Option<u64>,
}

impl Default for MockResponseConfig {
    fn default() -> Self {
        Self {
            success: true,
            description: None,
            expected_calls: None,
        }
    }
}

impl MockResponseConfig {
    pub fn failing(description: &'static str) -> Self {
        Self {
            success: false,
            description: Some(description),
            expected_calls: None,
        }
    }

    pub fn times(mut self, calls: u64) -> Self {
        self.expected_calls = Some(calls);
        self
    }
}

fn message_body(chat_id: i64, text: &str) -> Value {
    json!({
        "message_id": SENT_MESSAGE_ID,
        "from": {
            "id": 12345,
            "is_bot": true,
            "first_name": "GatherBuddy",
            "username": "GatherBuddyBot"
        },
        "chat": {
            "id": chat_id,
            "title": "Board Game Night",
            "type": "supergroup"
        },
        "date": 1767225600,
        "text": text
    })
}

fn error_body(description: &str) -> Value {
    json!({
        "ok": false,
        "error_code": 400,
        "description": description
    })
}

impl TelegramMockServer {
    /// Create a new mock Telegram API server
    pub async fn new() -> Self {
        let server = MockServer::start().await;
        Self { server }
    }

    /// Base URL to configure as the Bot API URL
    pub fn api_url(&self) -> String {
        self.server.uri()
    }

    fn method_path(name: &str) -> String {
        format!("/bot{}/{}", TEST_BOT_TOKEN, name)
    }

    /// Bot API method names are case-insensitive; teloxide sends them PascalCase
    fn method_path_regex(name: &str) -> String {
        format!("(?i)^{}$", regex::escape(&Self::method_path(name)))
    }

    async fn mount(&self, name: &str, config: MockResponseConfig, result: Value) {
        let (status, body) = if config.success {
            (200, json!({ "ok": true, "result": result }))
        } else {
            (400, error_body(config.description.unwrap_or("Bad Request")))
        };

        let mut mock = Mock::given(method("POST"))
            .and(path_regex(Self::method_path_regex(name)))
            .respond_with(ResponseTemplate::new(status).set_body_json(body));
        if let Some(calls) = config.expected_calls {
            mock = mock.expect(calls);
        }
        mock.mount(&self.server).await;
    }

    /// Setup mock for sendMessage endpoint
    pub async fn mock_send_message(&self, config: MockResponseConfig) {
        self.mount("sendMessage", config, message_body(TEST_GROUP_CHAT_ID, "dashboard"))
            .await;
    }

    /// Setup mock for editMessageText endpoint
    pub async fn mock_edit_message_text(&self, config: MockResponseConfig) {
        self.mount("editMessageText", config, message_body(TEST_GROUP_CHAT_ID, "edited"))
            .await;
    }

    /// Setup mock for pinChatMessage endpoint
    pub async fn mock_pin_chat_message(&self, config: MockResponseConfig) {
        self.mount("pinChatMessage", config, json!(true)).await;
    }

    /// Setup mock for unpinChatMessage endpoint
    pub async fn mock_unpin_chat_message(&self, config: MockResponseConfig) {
        self.mount("unpinChatMessage", config, json!(true)).await;
    }

    /// Setup mock for deleteMessage endpoint
    pub async fn mock_delete_message(&self, config: MockResponseConfig) {
        self.mount("deleteMessage", config, json!(true)).await;
    }

    /// Setup successful mocks for every method
    pub async fn setup_all_success(&self) {
        self.mock_send_message(MockResponseConfig::default()).await;
        self.mock_edit_message_text(MockResponseConfig::default()).await;
        self.mock_pin_chat_message(MockResponseConfig::default()).await;
        self.mock_unpin_chat_message(MockResponseConfig::default()).await;
        self.mock_delete_message(MockResponseConfig::default()).await;
    }

    /// Bodies of every request sent to a method, in order
    pub async fn requests_to(&self, name: &str) -> Vec<Value> {
        let wanted = Self::method_path(name);
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path().eq_ignore_ascii_case(&wanted))
            .filter_map(|request| serde_json::from_slice(&request.body).ok())
            .collect()
    }

    /// Texts sent with sendMessage, in order
    pub async fn sent_texts(&self) -> Vec<String> {
        self.requests_to("sendMessage")
            .await
            .iter()
            .filter_map(|body| body["text"].as_str().map(str::to_string))
            .collect()
    }
}
