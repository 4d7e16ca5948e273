use async_trait::async_trait;
use reqwest::{
    Client, StatusCode,
    header::{HeaderMap, HeaderValue},
};
use std::time::Duration;
use tracing::{debug, warn};

use crate::{
    ApiError,
    model::{MessageRequest, MessageResponse},
};

use super::CompletionClient;

const API_VERSION: &str = "2023-06-01";
const MESSAGES_PATH: &str = "/v1/messages";

/// Anthropic Messages API client bound to one base URL.
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    endpoint: String,
    http: Client,
}

impl AnthropicClient {
    pub fn new(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key).map_err(ApiError::unexpected)?;
        key.set_sensitive(true);
        headers.insert("x-api-key", key);
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));

        let http = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .user_agent(concat!("llm-probe/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ApiError::from)?;

        Ok(Self { endpoint: messages_url(base_url), http })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CompletionClient for AnthropicClient {
    async fn create_message(&self, request: &MessageRequest) -> Result<MessageResponse, ApiError> {
        debug!(endpoint = %self.endpoint, model = %request.model, "sending message request");

        let res = self.http.post(&self.endpoint).json(request).send().await?;

        let status = res.status();
        let body = res.text().await?;
        debug!(%status, bytes = body.len(), "received response");

        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!(%status, "rate limited by endpoint");
            return Err(ApiError::RateLimited { body: truncate_body(&body) });
        }

        if !status.is_success() {
            warn!(%status, "endpoint returned an error status");
            return Err(ApiError::Status { status: status.as_u16(), body: truncate_body(&body) });
        }

        let parsed: MessageResponse = serde_json::from_str(&body).map_err(|e| {
            ApiError::InvalidResponse(format!("{e}; body: {}", truncate_body(&body)))
        })?;

        if parsed.first_text().is_none() {
            return Err(ApiError::InvalidResponse(
                "response contained no text content".to_string(),
            ));
        }

        Ok(parsed)
    }
}

fn messages_url(base_url: &str) -> String {
    format!("{}{MESSAGES_PATH}", base_url.trim().trim_end_matches('/'))
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
