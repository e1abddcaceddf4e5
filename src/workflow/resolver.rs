//! Merge and two-pass resolution of the workflow
//!
//! Given the merged state, the first pass looks for the earliest step (by
//! definition order) holding one of its terminal answers; the second pass
//! picks the earliest unanswered step. Only when both come up empty is the
//! workflow complete.

use super::{ChatMessage, WorkflowDefinition, WorkflowState};
use crate::extractor::AnswerExtractor;
use crate::llm::LlmError;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by [`WorkflowResolver::resolve`]
///
/// A malformed oracle reply is not an error; it resolves as "no new answers".
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Answer extraction oracle unavailable: {0}")]
    OracleUnavailable(#[source] LlmError),
}

/// Outcome of one turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResult {
    pub next_question: Option<String>,
    pub updated_state: WorkflowState,
    pub complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    /// Step whose terminal answer ended the workflow, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal_step: Option<String>,
}

/// Decide the next action for an already merged state.
///
/// Pure and deterministic: the same definition and state always yield the
/// same result.
pub fn evaluate(definition: &WorkflowDefinition, updated_state: WorkflowState) -> ResolutionResult {
    let terminal = definition.steps().iter().find_map(|step| {
        let answer = updated_state.get(&step.id)?;
        step.is_terminal(answer).then(|| {
            (
                step.id.clone(),
                step.instructions_for(answer).map(str::to_string),
            )
        })
    });

    if let Some((step_id, instructions)) = terminal {
        return ResolutionResult {
            next_question: instructions.clone(),
            updated_state,
            complete: true,
            instructions,
            terminal_step: Some(step_id),
        };
    }

    let next_question = definition
        .steps()
        .iter()
        .find(|step| !updated_state.is_answered(&step.id))
        .map(|step| step.question.clone());

    ResolutionResult {
        complete: next_question.is_none(),
        next_question,
        updated_state,
        instructions: None,
        terminal_step: None,
    }
}

/// Stateless per-turn resolver
///
/// Holds no conversation state; callers pass the previous turn's
/// `updated_state` back in and must serialize turns of the same thread.
pub struct WorkflowResolver {
    definition: Arc<WorkflowDefinition>,
    extractor: AnswerExtractor,
}

impl WorkflowResolver {
    pub fn new(extractor: AnswerExtractor) -> Self {
        Self {
            definition: extractor.definition(),
            extractor,
        }
    }

    pub fn definition(&self) -> &WorkflowDefinition {
        &self.definition
    }

    pub async fn resolve(
        &self,
        user_message: &str,
        current_state: &WorkflowState,
        chat_history: &[ChatMessage],
    ) -> Result<ResolutionResult, ResolveError> {
        let extraction = self
            .extractor
            .extract(user_message, current_state, chat_history)
            .await
            .map_err(ResolveError::OracleUnavailable)?;

        let overwritten = extraction
            .iter()
            .filter(|(step_id, _)| current_state.is_answered(step_id))
            .count();
        if overwritten > 0 {
            tracing::debug!(overwritten, "Extraction overwrote previously answered steps");
        }

        let updated_state = current_state.merge(&extraction);
        let result = evaluate(&self.definition, updated_state);

        tracing::info!(
            workflow = %self.definition.name(),
            extracted = extraction.len(),
            answered = result.updated_state.len(),
            complete = result.complete,
            terminal_step = ?result.terminal_step,
            "Workflow turn resolved"
        );

        Ok(result)
    }
}
