//! Text completion backends
//!
//! One request/response shape shared by the answer-extraction oracle and the
//! advisor, with `OpenAI`-compatible and Anthropic implementations behind
//! [`LlmService`].

mod anthropic;
mod error;
mod models;
mod openai;
mod registry;
mod types;

#[cfg(test)]
pub mod testing;

pub use anthropic::AnthropicService;
pub use error::{LlmError, LlmErrorKind};
pub use models::{all_models, ModelDef, Provider};
pub use openai::OpenAIService;
pub use registry::{LlmConfig, ModelInfo, ModelRegistry};
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

#[async_trait]
pub trait LlmService: Send + Sync {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    fn model_id(&self) -> &str;

    /// Context window in tokens
    fn context_window(&self) -> usize;
}

/// Wraps a service and emits one structured event per call
pub struct LoggingService {
    inner: Arc<dyn LlmService>,
    model_id: String,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn LlmService>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl LlmService for LoggingService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let prompt_chars: usize = request.messages.iter().map(|m| m.text.len()).sum();
        let started = Instant::now();
        let result = self.inner.complete(request).await;
        let elapsed_ms = started.elapsed().as_millis();

        match &result {
            Ok(response) => tracing::info!(
                model = %self.model_id,
                elapsed_ms = %elapsed_ms,
                messages = request.messages.len(),
                prompt_chars,
                temperature = ?request.temperature,
                input_tokens = response.usage.input_tokens,
                output_tokens = response.usage.output_tokens,
                end_turn = response.end_turn,
                "LLM completion finished"
            ),
            Err(e) => tracing::error!(
                model = %self.model_id,
                elapsed_ms = %elapsed_ms,
                kind = ?e.kind,
                retryable = e.kind.is_retryable(),
                error = %e.message,
                "LLM completion failed"
            ),
        }

        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn context_window(&self) -> usize {
        self.inner.context_window()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MockLlmService;
    use super::*;

    #[tokio::test]
    async fn test_logging_service_is_transparent() {
        let inner = Arc::new(MockLlmService::new("wrapped"));
        inner.queue_text("hello");
        inner.queue_error(LlmError::auth("nope"));
        let service = LoggingService::new(inner.clone());

        assert_eq!(service.model_id(), "wrapped");
        assert_eq!(service.context_window(), inner.context_window());

        let request = LlmRequest::user_prompt("hi").with_temperature(0.0);
        assert_eq!(service.complete(&request).await.unwrap().text, "hello");
        let err = service.complete(&request).await.unwrap_err();
        assert_eq!(err.kind, LlmErrorKind::Auth);
        assert_eq!(inner.recorded_requests().len(), 2);
    }
}
