use crate::error::LlmError;
use crate::llm::Clock;
use std::time::Duration;

const MAX_ATTEMPTS: u32 = 3;
const RETRY_DELAY_MS: u64 = 2000;

pub struct RetryConfig {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    /// Fixed pause between attempts. Does not grow with the attempt number.
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            delay: Duration::from_millis(RETRY_DELAY_MS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    Fail,
}

/// Transport failures and non-2xx statuses are worth another attempt;
/// everything else is final.
pub fn classify(error: &LlmError) -> RetryDecision {
    if error.is_retryable() {
        RetryDecision::Retry
    } else {
        RetryDecision::Fail
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Idle,
    Attempting { attempt: u32 },
    Backoff { attempt: u32 },
    Succeeded,
    ExhaustedFailed { attempts: u32 },
    /// Stopped on a non-retryable error.
    Rejected,
}

impl RetryState {
    pub fn start(self) -> Self {
        match self {
            RetryState::Idle => RetryState::Attempting { attempt: 1 },
            RetryState::Backoff { attempt } => RetryState::Attempting {
                attempt: attempt + 1,
            },
            other => other,
        }
    }

    pub fn succeed(self) -> Self {
        match self {
            RetryState::Attempting { .. } => RetryState::Succeeded,
            other => other,
        }
    }

    pub fn fail(self, decision: RetryDecision, max_attempts: u32) -> Self {
        match (self, decision) {
            (RetryState::Attempting { .. }, RetryDecision::Fail) => RetryState::Rejected,
            (RetryState::Attempting { attempt }, RetryDecision::Retry) if attempt >= max_attempts => {
                RetryState::ExhaustedFailed { attempts: attempt }
            }
            (RetryState::Attempting { attempt }, RetryDecision::Retry) => {
                RetryState::Backoff { attempt }
            }
            (other, _) => other,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RetryState::Succeeded | RetryState::ExhaustedFailed { .. } | RetryState::Rejected
        )
    }
}

pub async fn with_retry<T, F, Fut>(
    config: &RetryConfig,
    clock: &dyn Clock,
    mut operation: F,
) -> Result<T, LlmError>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, LlmError>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let state = RetryState::Attempting { attempt };

        let e = match operation(attempt).await {
            Ok(result) => {
                debug_assert_eq!(state.succeed(), RetryState::Succeeded);
                return Ok(result);
            }
            Err(e) => e,
        };

        match state.fail(classify(&e), max_attempts) {
            RetryState::Backoff { attempt: failed } => {
                tracing::warn!(
                    "Request failed (attempt {}/{}), retrying in {}ms: {}",
                    failed,
                    max_attempts,
                    config.delay.as_millis(),
                    e
                );
                clock.sleep(config.delay).await;
                attempt = failed + 1;
            }
            RetryState::ExhaustedFailed { attempts } => {
                tracing::error!("Request failed after {} attempts: {}", attempts, e);
                return Err(LlmError::Exhausted {
                    attempts,
                    last: Box::new(e),
                });
            }
            _ => {
                tracing::error!("Request failed with non-retryable error: {}", e);
                return Err(e);
            }
        }
    }
}
