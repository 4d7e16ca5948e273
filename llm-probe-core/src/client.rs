use crate::{
    ApiError, ProbeConfig,
    model::{MessageRequest, MessageResponse},
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod anthropic;

pub use anthropic::AnthropicClient;

#[async_trait]
pub trait CompletionClient: Send + Sync + Debug {
    async fn create_message(&self, request: &MessageRequest) -> Result<MessageResponse, ApiError>;
}

/// Construct the HTTP client for `config`. Does no network I/O.
pub fn client_from_config(config: &ProbeConfig) -> Result<Box<dyn CompletionClient>, ApiError> {
    let client = AnthropicClient::new(&config.api_key, &config.base_url, config.timeout)?;
    Ok(Box::new(client))
}
