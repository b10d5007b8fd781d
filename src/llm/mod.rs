mod clock;
mod retry;
mod throttle;

pub mod openai;

pub use clock::{Clock, ManualClock, SystemClock};
pub use retry::{classify, with_retry, RetryConfig, RetryDecision, RetryState};
pub use throttle::RateLimiter;

use crate::error::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const PING_MAX_TOKENS: u32 = 50;

#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Runs one logical completion request and returns the first choice's content.
    ///
    /// `model` falls back to the client's default when `None`.
    async fn complete(
        &self,
        messages: &[Message],
        model: Option<&str>,
        max_tokens: u32,
    ) -> Result<String, LlmError>;

    /// Sends a fixed probe to check that the endpoint and key work.
    async fn ping(&self) -> Result<String, LlmError> {
        let messages = [
            Message::system("You are a helpful assistant."),
            Message::user("Say this is a test"),
        ];
        self.complete(&messages, None, PING_MAX_TOKENS).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// Checks the outbound invariants: a non-empty list ending with a user turn,
/// and a positive token budget.
pub fn validate_request(messages: &[Message], max_tokens: u32) -> Result<(), LlmError> {
    if max_tokens == 0 {
        return Err(LlmError::InvalidRequest(
            "max_tokens must be greater than zero".to_string(),
        ));
    }
    match messages.last() {
        None => Err(LlmError::InvalidRequest(
            "message list must not be empty".to_string(),
        )),
        Some(last) if last.role != Role::User => Err(LlmError::InvalidRequest(
            "last message must have role user".to_string(),
        )),
        Some(_) => Ok(()),
    }
}
