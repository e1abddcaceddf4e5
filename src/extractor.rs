//! Answer extraction
//!
//! Builds the extraction prompt, asks the oracle, records the exchange in the
//! audit log and parses the `<NewAnswers>` block of the reply.

mod oracle;
mod parse;
mod prompt;

#[cfg(test)]
pub mod testing;

pub use oracle::{AnswerExtractionOracle, LlmOracle, OracleRequest, OracleResponse};
pub use parse::{parse_new_answers, try_parse_new_answers, MalformedExtraction};
pub use prompt::build_extraction_prompt;

use crate::audit::{AuditRecord, AuditSink};
use crate::llm::LlmError;
use crate::workflow::{ChatMessage, ExtractionResult, StepDefinition, WorkflowDefinition, WorkflowState};
use std::sync::Arc;

pub struct AnswerExtractor {
    definition: Arc<WorkflowDefinition>,
    oracle: Arc<dyn AnswerExtractionOracle>,
    audit: Arc<dyn AuditSink>,
}

impl AnswerExtractor {
    pub fn new(
        definition: Arc<WorkflowDefinition>,
        oracle: Arc<dyn AnswerExtractionOracle>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            definition,
            oracle,
            audit,
        }
    }

    pub fn definition(&self) -> Arc<WorkflowDefinition> {
        Arc::clone(&self.definition)
    }

    /// Ask the oracle which answers the new message settles.
    ///
    /// Only transport failures are errors. A reply without a usable block
    /// is an empty result, and proposals for steps the definition does not
    /// know are dropped.
    pub async fn extract(
        &self,
        user_message: &str,
        current_state: &WorkflowState,
        chat_history: &[ChatMessage],
    ) -> Result<ExtractionResult, LlmError> {
        let remaining: Vec<&StepDefinition> = self
            .definition
            .steps()
            .iter()
            .filter(|step| !current_state.is_answered(&step.id))
            .collect();

        let prompt = build_extraction_prompt(
            &self.definition,
            current_state,
            &remaining,
            chat_history,
            user_message,
        );
        let request = OracleRequest::deterministic(prompt);
        let response = self.oracle.generate(&request).await?;

        let record = AuditRecord::now(request.prompt, response.text.as_str());
        if let Err(e) = self.audit.append(&record).await {
            tracing::warn!(error = %e, "Failed to append audit record");
        }

        let mut extraction = parse_new_answers(&response.text);
        let proposed = extraction.len();
        extraction.retain(|step_id| self.definition.contains_step(step_id));
        let unknown = proposed - extraction.len();
        if unknown > 0 {
            tracing::warn!(unknown, "Dropped answers for unknown steps");
        }

        tracing::debug!(
            remaining = remaining.len(),
            extracted = extraction.len(),
            "Extraction complete"
        );
        Ok(extraction)
    }
}
