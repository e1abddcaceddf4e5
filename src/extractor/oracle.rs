//! Text-generation capability used for answer extraction

use crate::llm::{LlmError, LlmRequest, LlmService};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

const ORACLE_SYSTEM: &str =
    "You are a precise information extraction engine. Follow the requested output format exactly.";
const ORACLE_MAX_TOKENS: u32 = 1024;

/// Prompt plus decoding parameters sent to the oracle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OracleRequest {
    pub prompt: String,
    pub temperature: f32,
}

impl OracleRequest {
    /// Lowest temperature the providers accept
    pub const MIN_TEMPERATURE: f32 = 0.0;

    pub fn deterministic(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: Self::MIN_TEMPERATURE,
        }
    }
}

/// Raw oracle output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleResponse {
    pub text: String,
}

/// Untrusted, possibly non-deterministic function from prompt to text
#[async_trait]
pub trait AnswerExtractionOracle: Send + Sync {
    async fn generate(&self, request: &OracleRequest) -> Result<OracleResponse, LlmError>;
}

/// Oracle backed by one of the registered LLM services
pub struct LlmOracle {
    service: Arc<dyn LlmService>,
}

impl LlmOracle {
    pub fn new(service: Arc<dyn LlmService>) -> Self {
        Self { service }
    }

    pub fn model_id(&self) -> &str {
        self.service.model_id()
    }
}

#[async_trait]
impl AnswerExtractionOracle for LlmOracle {
    async fn generate(&self, request: &OracleRequest) -> Result<OracleResponse, LlmError> {
        let llm_request = LlmRequest::user_prompt(request.prompt.clone())
            .with_system(ORACLE_SYSTEM)
            .with_temperature(request.temperature)
            .with_max_tokens(ORACLE_MAX_TOKENS);

        let response = self.service.complete(&llm_request).await?;
        Ok(OracleResponse {
            text: response.text,
        })
    }
}
