use crate::config::ProviderConfig;
use crate::error::LlmError;
use crate::llm::{
    validate_request, with_retry, Clock, Message, ModelClient, RateLimiter, RetryConfig,
    SystemClock,
};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAIClient {
    client: Client,
    api_key: SecretString,
    base_url: String,
    default_model: String,
    retry: RetryConfig,
    limiter: RateLimiter,
    clock: Arc<dyn Clock>,
}

impl OpenAIClient {
    pub fn new(config: &ProviderConfig) -> Result<Self, LlmError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &ProviderConfig, clock: Arc<dyn Clock>) -> Result<Self, LlmError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;

        tracing::info!("Initialized completion client with base_url: {}", config.base_url);

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            default_model: config.default_model.clone(),
            retry: RetryConfig {
                max_attempts: config.retry_count,
                delay: config.retry_delay,
            },
            limiter: RateLimiter::new(config.min_request_interval, clock.clone()),
            clock,
        })
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn send_once(
        &self,
        messages: &[Message],
        model: &str,
        max_tokens: u32,
        attempt: u32,
    ) -> Result<String, LlmError> {
        self.limiter.acquire().await;

        tracing::info!(
            "Sending request to {} (model: {}, messages: {}, attempt: {})",
            self.base_url,
            model,
            messages.len(),
            attempt
        );
        tracing::debug!("Request messages: {:?}", messages);

        let request = ChatRequest {
            model,
            messages,
            max_tokens,
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Request error occurred: {} - {}", self.endpoint(), e);
                LlmError::Transport(e)
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(LlmError::Transport)?;

        if !status.is_success() {
            let body = String::from_utf8_lossy(&body).into_owned();
            tracing::error!("HTTP error occurred: {} - {}", status.as_u16(), body);
            return Err(LlmError::RemoteStatus {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(
            "Received response from completion API: {}",
            String::from_utf8_lossy(&body)
        );

        let chat_response: ChatResponse = serde_json::from_slice(&body)
            .map_err(|e| LlmError::MalformedResponse(format!("Invalid response: {}", e)))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::MalformedResponse("No choices in response".to_string()))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl ModelClient for OpenAIClient {
    async fn complete(
        &self,
        messages: &[Message],
        model: Option<&str>,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        validate_request(messages, max_tokens)?;
        let model = model.unwrap_or(self.default_model.as_str());

        with_retry(&self.retry, self.clock.as_ref(), |attempt| {
            self.send_once(messages, model, max_tokens, attempt)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmErrorKind;
    use crate::llm::ManualClock;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn completion_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }]
        })
    }

    fn test_client(base_url: &str) -> (OpenAIClient, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let config = ProviderConfig::with_api_key("sk-test").with_base_url(base_url);
        let client = OpenAIClient::with_clock(&config, clock.clone()).unwrap();
        (client, clock)
    }

    async fn request_count(server: &MockServer) -> usize {
        server.received_requests().await.unwrap_or_default().len()
    }

    #[tokio::test]
    async fn test_complete_returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-3.5-turbo",
                "max_tokens": 100,
                "messages": [{"role": "user", "content": "hello"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("hi there")))
            .expect(1)
            .mount(&server)
            .await;

        let (client, _) = test_client(&server.uri());
        let reply = client.complete(&[Message::user("hello")], None, 100).await;
        assert_eq!(reply.unwrap(), "hi there");
    }

    #[tokio::test]
    async fn test_model_override_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({"model": "gpt-4o-mini"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("ok")))
            .expect(1)
            .mount(&server)
            .await;

        let (client, _) = test_client(&server.uri());
        let reply = client
            .complete(&[Message::user("hello")], Some("gpt-4o-mini"), 10)
            .await;
        assert_eq!(reply.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_fails_twice_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .up_to_n_times(2)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("third time")))
            .mount(&server)
            .await;

        let (client, clock) = test_client(&server.uri());
        let reply = client.complete(&[Message::user("hello")], None, 10).await;

        assert_eq!(reply.unwrap(), "third time");
        assert_eq!(request_count(&server).await, 3);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(2); 2]);
    }

    #[tokio::test]
    async fn test_rate_limited_on_every_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .expect(3)
            .mount(&server)
            .await;

        let (client, _) = test_client(&server.uri());
        let err = client
            .complete(&[Message::user("hello")], None, 10)
            .await
            .unwrap_err();

        assert!(err.is_exhausted());
        assert_eq!(err.kind(), LlmErrorKind::RemoteStatus);
        match err {
            LlmError::Exhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, LlmError::RemoteStatus { status: 429, .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transport_failure_is_retried() {
        let (client, clock) = test_client("http://127.0.0.1:1");
        let err = client
            .complete(&[Message::user("hello")], None, 10)
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::Exhausted { attempts: 3, .. }));
        assert_eq!(err.kind(), LlmErrorKind::Transport);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(2); 2]);
    }

    #[tokio::test]
    async fn test_missing_choices_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "x"})))
            .expect(1)
            .mount(&server)
            .await;

        let (client, _) = test_client(&server.uri());
        let err = client
            .complete(&[Message::user("hello")], None, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_invalid_json_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let (client, _) = test_client(&server.uri());
        let err = client
            .complete(&[Message::user("hello")], None, 10)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), LlmErrorKind::MalformedResponse);
    }

    #[tokio::test]
    async fn test_invalid_request_makes_no_call() {
        let server = MockServer::start().await;
        let (client, _) = test_client(&server.uri());

        let err = client.complete(&[], None, 10).await.unwrap_err();
        assert_eq!(err.kind(), LlmErrorKind::UserInput);

        let err = client
            .complete(&[Message::assistant("hi")], None, 10)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), LlmErrorKind::UserInput);

        assert_eq!(request_count(&server).await, 0);
    }

    #[tokio::test]
    async fn test_consecutive_calls_are_spaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("ok")))
            .mount(&server)
            .await;

        let (client, clock) = test_client(&server.uri());
        client.complete(&[Message::user("one")], None, 10).await.unwrap();
        let first = client.limiter().last_request_time().await.unwrap();
        client.complete(&[Message::user("two")], None, 10).await.unwrap();
        let second = client.limiter().last_request_time().await.unwrap();

        assert!(second - first >= Duration::from_secs(1));
        assert_eq!(clock.sleeps().len(), 1);
    }

    #[tokio::test]
    async fn test_ping_sends_probe() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({
                "max_tokens": 50,
                "messages": [
                    {"role": "system", "content": "You are a helpful assistant."},
                    {"role": "user", "content": "Say this is a test"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("This is a test")))
            .expect(1)
            .mount(&server)
            .await;

        let (client, _) = test_client(&server.uri());
        assert_eq!(client.ping().await.unwrap(), "This is a test");
    }
}
