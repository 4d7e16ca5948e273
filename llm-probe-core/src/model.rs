use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ErrorKind;

#[derive(Debug, Clone, Serialize)]
pub struct MessageRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl MessageRequest {
    /// A single user turn.
    pub fn user(model: &str, max_tokens: u32, prompt: &str) -> Self {
        Self {
            model: model.to_string(),
            max_tokens,
            messages: vec![ChatMessage { role: "user".to_string(), content: prompt.to_string() }],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

/// Content segments; only text is read, everything else is kept opaque.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl MessageResponse {
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            ContentBlock::Other => None,
        })
    }
}

/// Outcome of one probe run.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub success: bool,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub response_text: String,
    pub error_kind: Option<ErrorKind>,
}

impl ProbeResult {
    /// Process exit status: 0 on success, 1 for every failure category.
    pub fn exit_status(&self) -> u8 {
        if self.success { 0 } else { 1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_to_messages_shape() {
        let req = MessageRequest::user("claude-test", 50, "hi");
        let json = serde_json::to_value(&req).expect("serializable");

        assert_eq!(
            json,
            serde_json::json!({
                "model": "claude-test",
                "max_tokens": 50,
                "messages": [{ "role": "user", "content": "hi" }]
            })
        );
    }

    #[test]
    fn first_text_skips_non_text_blocks() {
        let body = r#"{
            "id": "msg_1",
            "content": [
                { "type": "thinking", "thinking": "..." },
                { "type": "text", "text": "你好！" }
            ],
            "usage": { "input_tokens": 12, "output_tokens": 4 }
        }"#;
        let parsed: MessageResponse = serde_json::from_str(body).expect("valid body");

        assert_eq!(parsed.first_text(), Some("你好！"));
        assert_eq!(parsed.usage, Some(Usage { input_tokens: 12, output_tokens: 4 }));
    }

    #[test]
    fn exit_status_follows_success() {
        let mut result = ProbeResult {
            success: true,
            started_at: Utc::now(),
            elapsed: Duration::ZERO,
            response_text: String::new(),
            error_kind: None,
        };
        assert_eq!(result.exit_status(), 0);

        result.success = false;
        result.error_kind = Some(ErrorKind::Unknown);
        assert_eq!(result.exit_status(), 1);
    }
}
