//! Policy advisor for satisfied workflows
//!
//! Once every step is answered without hitting a terminal answer, follow-up
//! questions are answered by a general model primed with the collected
//! answers.

use crate::llm::{LlmError, LlmMessage, LlmRequest, LlmService};
use crate::workflow::{ChatMessage, ChatRole, WorkflowDefinition, WorkflowState};
use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;

const ADVISOR_SYSTEM: &str = "You are a helpful policy advisor who provides accurate, well-structured answers based on company policies.";

const ADVISOR_GUIDANCE: &str = r"Please provide a clear, well-structured answer that:
1. Directly addresses the question
2. Refers to the recorded answers where relevant
3. Explains any important context or implications
4. Highlights any limitations or additional considerations";

const ADVISOR_TEMPERATURE: f32 = 0.3;
const ADVISOR_MAX_TOKENS: u32 = 4000;
const MAX_ATTEMPTS: u32 = 3;

/// Answers free-form questions about a completed intake
pub struct Advisor {
    service: Arc<dyn LlmService>,
    base_delay: Duration,
}

impl Advisor {
    pub fn new(service: Arc<dyn LlmService>) -> Self {
        Self {
            service,
            base_delay: Duration::from_secs(1),
        }
    }

    /// Override the first retry delay; later retries double it.
    #[must_use]
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn model_id(&self) -> &str {
        self.service.model_id()
    }

    /// Answer `message` in the context of the collected answers.
    ///
    /// Retryable provider errors are retried, waiting for the provider's
    /// retry hint when it sends one and backing off exponentially otherwise.
    pub async fn answer(
        &self,
        message: &str,
        definition: &WorkflowDefinition,
        state: &WorkflowState,
        history: &[ChatMessage],
    ) -> Result<String, LlmError> {
        let request = build_advisor_request(message, definition, state, history);

        let mut attempt = 1;
        loop {
            match self.service.complete(&request).await {
                Ok(response) => return Ok(response.text.trim().to_string()),
                Err(e) if e.kind.is_retryable() && attempt < MAX_ATTEMPTS => {
                    let delay = self.retry_delay(attempt, e.retry_after);
                    tracing::warn!(
                        attempt,
                        delay_ms = %delay.as_millis(),
                        error = %e.message,
                        "Advisor request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn retry_delay(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        hint.unwrap_or_else(|| self.base_delay * (1 << (attempt - 1)))
    }
}

fn build_advisor_request(
    message: &str,
    definition: &WorkflowDefinition,
    state: &WorkflowState,
    history: &[ChatMessage],
) -> LlmRequest {
    let mut context = String::new();
    let _ = writeln!(
        context,
        "You are a knowledgeable policy advisor. The requester completed the \"{}\" questionnaire with these answers:",
        definition.name()
    );
    for step in definition.steps() {
        if let Some(answer) = state.get(&step.id).filter(|a| !a.is_empty()) {
            let _ = writeln!(context, "- {} {answer}", step.question);
        }
    }
    context.push_str(
        "\nUsing only these answers and general policy knowledge, answer the requester. \
         If something cannot be determined, say what is missing.\n\n",
    );
    context.push_str(ADVISOR_GUIDANCE);

    // replay the chat after the primer so the model sees the whole exchange
    let mut messages = vec![LlmMessage::user(context)];
    for entry in history {
        messages.push(match entry.role {
            ChatRole::User => LlmMessage::user(entry.contents.clone()),
            ChatRole::Bot => LlmMessage::assistant(entry.contents.clone()),
        });
    }
    messages.push(LlmMessage::user(message));

    LlmRequest {
        system: Some(ADVISOR_SYSTEM.to_string()),
        messages,
        max_tokens: Some(ADVISOR_MAX_TOKENS),
        temperature: Some(ADVISOR_TEMPERATURE),
    }
}
