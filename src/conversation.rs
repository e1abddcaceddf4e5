//! Chat-turn handling on top of the stateless resolver
//!
//! The handler owns the per-thread state the resolver refuses to keep. It
//! hands each turn's `updated_state` back in on the next turn and decides
//! what the user sees: the next question, terminal instructions, or an
//! advisor answer once the workflow is satisfied.

mod thread;

pub use thread::{Thread, ThreadOutcome, ThreadStore};

use crate::advisor::Advisor;
use crate::llm::LlmError;
use crate::workflow::{
    ChatMessage, ResolutionResult, ResolveError, WorkflowDefinition, WorkflowResolver,
    WorkflowState,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TurnError {
    #[error("Unknown thread: {0}")]
    UnknownThread(String),
    #[error("Message must not be empty")]
    EmptyMessage,
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("Advisor unavailable: {0}")]
    Advisor(#[source] LlmError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    /// Reply is the next question
    Question,
    /// Reply is the terminal instructions
    Terminated,
    /// Reply comes from the advisor
    Answered,
}

/// Workflow position after a turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowView {
    pub complete: bool,
    pub next_question: Option<String>,
    pub instructions: Option<String>,
    pub answers: WorkflowState,
    /// Guidance attached to answers given this turn
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnReply {
    pub thread_id: String,
    pub status: TurnStatus,
    pub reply: String,
    pub workflow: WorkflowView,
}

/// Everything a successful turn commits
struct Turn {
    status: TurnStatus,
    reply: String,
    workflow: WorkflowView,
    outcome: ThreadOutcome,
}

pub struct ChatTurnHandler {
    resolver: WorkflowResolver,
    advisor: Advisor,
    threads: ThreadStore,
}

impl ChatTurnHandler {
    pub fn new(resolver: WorkflowResolver, advisor: Advisor) -> Self {
        Self {
            resolver,
            advisor,
            threads: ThreadStore::new(),
        }
    }

    pub fn definition(&self) -> &WorkflowDefinition {
        self.resolver.definition()
    }

    /// Open a thread; the reply is the first question.
    pub async fn create_thread(&self) -> TurnReply {
        let first_question = self.definition().first_question().map(str::to_string);
        let thread = self.threads.create(first_question.as_deref()).await;

        tracing::info!(thread_id = %thread.id, "Thread created");

        TurnReply {
            thread_id: thread.id,
            status: TurnStatus::Question,
            reply: first_question.clone().unwrap_or_default(),
            workflow: WorkflowView {
                complete: false,
                next_question: first_question,
                instructions: None,
                answers: thread.state,
                notes: Vec::new(),
            },
        }
    }

    pub async fn thread(&self, thread_id: &str) -> Option<Thread> {
        let handle = self.threads.get(thread_id).await?;
        let thread = handle.lock().await;
        Some(thread.clone())
    }

    /// End a conversation and discard its state.
    pub async fn end_thread(&self, thread_id: &str) -> Result<(), TurnError> {
        if !self.threads.remove(thread_id).await {
            return Err(TurnError::UnknownThread(thread_id.to_string()));
        }
        tracing::info!(thread_id = %thread_id, "Thread ended");
        Ok(())
    }

    /// Run one turn.
    ///
    /// Nothing is committed to the thread unless the whole turn succeeds.
    pub async fn handle_turn(&self, thread_id: &str, message: &str) -> Result<TurnReply, TurnError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(TurnError::EmptyMessage);
        }
        let handle = self
            .threads
            .get(thread_id)
            .await
            .ok_or_else(|| TurnError::UnknownThread(thread_id.to_string()))?;
        let mut thread = handle.lock().await;

        let turn = match &thread.outcome {
            ThreadOutcome::Terminated { instructions, .. } => Turn {
                status: TurnStatus::Terminated,
                reply: instructions.clone(),
                workflow: WorkflowView {
                    complete: true,
                    next_question: Some(instructions.clone()),
                    instructions: Some(instructions.clone()),
                    answers: thread.state.clone(),
                    notes: Vec::new(),
                },
                outcome: thread.outcome.clone(),
            },
            ThreadOutcome::Satisfied => {
                let reply = self
                    .advisor
                    .answer(message, self.definition(), &thread.state, &thread.history)
                    .await
                    .map_err(TurnError::Advisor)?;
                Turn {
                    status: TurnStatus::Answered,
                    reply,
                    workflow: WorkflowView {
                        complete: true,
                        next_question: None,
                        instructions: None,
                        answers: thread.state.clone(),
                        notes: Vec::new(),
                    },
                    outcome: ThreadOutcome::Satisfied,
                }
            }
            ThreadOutcome::InProgress => {
                let result = self
                    .resolver
                    .resolve(message, &thread.state, &thread.history)
                    .await?;
                self.apply_resolution(message, &thread.state, &thread.history, result)
                    .await?
            }
        };

        thread.state = turn.workflow.answers.clone();
        thread.history.push(ChatMessage::user(message));
        thread.history.push(ChatMessage::bot(turn.reply.clone()));
        thread.outcome = turn.outcome;

        tracing::info!(
            thread_id = %thread.id,
            status = ?turn.status,
            answered = thread.state.len(),
            "Chat turn handled"
        );

        Ok(TurnReply {
            thread_id: thread.id.clone(),
            status: turn.status,
            reply: turn.reply,
            workflow: turn.workflow,
        })
    }

    async fn apply_resolution(
        &self,
        message: &str,
        previous: &WorkflowState,
        history: &[ChatMessage],
        result: ResolutionResult,
    ) -> Result<Turn, TurnError> {
        let ResolutionResult {
            next_question,
            updated_state,
            complete,
            instructions,
            terminal_step,
        } = result;

        if let (true, Some(text)) = (complete, instructions.as_ref()) {
            let outcome = ThreadOutcome::Terminated {
                step: terminal_step,
                instructions: text.clone(),
            };
            let view = WorkflowView {
                complete,
                next_question,
                instructions: instructions.clone(),
                answers: updated_state,
                notes: Vec::new(),
            };
            return Ok(Turn {
                status: TurnStatus::Terminated,
                reply: text.clone(),
                workflow: view,
                outcome,
            });
        }

        let notes = answer_notes(self.definition(), previous, &updated_state);

        let (status, body, outcome) = if complete {
            let answer = self
                .advisor
                .answer(message, self.definition(), &updated_state, history)
                .await
                .map_err(TurnError::Advisor)?;
            (TurnStatus::Answered, answer, ThreadOutcome::Satisfied)
        } else {
            (
                TurnStatus::Question,
                next_question.clone().unwrap_or_default(),
                ThreadOutcome::InProgress,
            )
        };

        let reply = if notes.is_empty() {
            body
        } else {
            format!("{}\n\n{body}", notes.join("\n"))
        };

        let view = WorkflowView {
            complete,
            next_question,
            instructions,
            answers: updated_state,
            notes,
        };
        Ok(Turn {
            status,
            reply,
            workflow: view,
            outcome,
        })
    }
}

/// Non-terminal instructions for answers that changed this turn, in
/// definition order.
fn answer_notes(
    definition: &WorkflowDefinition,
    previous: &WorkflowState,
    updated: &WorkflowState,
) -> Vec<String> {
    definition
        .steps()
        .iter()
        .filter_map(|step| {
            let answer = updated.get(&step.id)?;
            if previous.get(&step.id) == Some(answer) || step.is_terminal(answer) {
                return None;
            }
            step.instructions_for(answer).map(str::to_string)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditLog;
    use crate::extractor::testing::MockOracle;
    use crate::extractor::AnswerExtractor;
    use crate::llm::testing::MockLlmService;
    use crate::workflow::StepDefinition;
    use std::sync::Arc;
    use std::time::Duration;

    const GRANT_STOP: &str = "Templates cannot be used for Grants.";
    const QUOTES_NOTE: &str = "Attach three quotes.";

    fn definition() -> WorkflowDefinition {
        WorkflowDefinition::new(
            "mini",
            "1",
            vec![
                StepDefinition::new("kind", "Procurement or grant?")
                    .allow(["Procurement", "Grant"])
                    .terminal("Grant", GRANT_STOP),
                StepDefinition::new("value", "How much?")
                    .allow(["LOW", "MID"])
                    .instruction("MID", QUOTES_NOTE),
            ],
        )
        .unwrap()
    }

    struct Harness {
        handler: Arc<ChatTurnHandler>,
        oracle: Arc<MockOracle>,
        advisor: Arc<MockLlmService>,
    }

    fn harness() -> Harness {
        let oracle = Arc::new(MockOracle::new());
        let advisor = Arc::new(MockLlmService::new("advisor"));
        let extractor = AnswerExtractor::new(
            Arc::new(definition()),
            oracle.clone(),
            Arc::new(MemoryAuditLog::new()),
        );
        let handler = ChatTurnHandler::new(
            WorkflowResolver::new(extractor),
            Advisor::new(advisor.clone()).with_base_delay(Duration::ZERO),
        );
        Harness {
            handler: Arc::new(handler),
            oracle,
            advisor,
        }
    }

    fn answers(pairs: &[(&str, &str)]) -> String {
        let body: String = pairs
            .iter()
            .map(|(step, value)| format!("<Answer step=\"{step}\">{value}</Answer>"))
            .collect();
        format!("<NewAnswers>{body}</NewAnswers>")
    }

    #[tokio::test]
    async fn test_create_thread_asks_first_question() {
        let h = harness();
        let created = h.handler.create_thread().await;

        assert_eq!(created.status, TurnStatus::Question);
        assert_eq!(created.reply, "Procurement or grant?");
        assert!(!created.workflow.complete);

        let thread = h.handler.thread(&created.thread_id).await.unwrap();
        assert_eq!(thread.history, vec![ChatMessage::bot("Procurement or grant?")]);
    }

    #[tokio::test]
    async fn test_question_turn_commits_state_and_history() {
        let h = harness();
        let id = h.handler.create_thread().await.thread_id;
        h.oracle.queue_text(answers(&[("kind", "Procurement")]));

        let reply = h.handler.handle_turn(&id, "  buying pens  ").await.unwrap();

        assert_eq!(reply.status, TurnStatus::Question);
        assert_eq!(reply.reply, "How much?");
        assert_eq!(reply.workflow.answers.get("kind"), Some("Procurement"));

        let thread = h.handler.thread(&id).await.unwrap();
        assert_eq!(thread.state.get("kind"), Some("Procurement"));
        assert_eq!(thread.history.len(), 3);
        assert_eq!(thread.history[1], ChatMessage::user("buying pens"));
        assert_eq!(thread.history[2], ChatMessage::bot("How much?"));
    }

    #[tokio::test]
    async fn test_state_is_threaded_into_next_turn() {
        let h = harness();
        let id = h.handler.create_thread().await.thread_id;
        h.oracle.queue_text(answers(&[("kind", "Procurement")]));
        h.oracle.queue_text(answers(&[]));

        h.handler.handle_turn(&id, "buying pens").await.unwrap();
        h.handler.handle_turn(&id, "not sure yet").await.unwrap();

        let second_prompt = &h.oracle.recorded_requests()[1].prompt;
        assert!(second_prompt.contains("- kind: Procurement"));
        assert!(second_prompt.contains("user: buying pens"));
    }

    #[tokio::test]
    async fn test_oracle_failure_commits_nothing() {
        let h = harness();
        let id = h.handler.create_thread().await.thread_id;
        h.oracle.queue_error(LlmError::network("down"));

        let err = h.handler.handle_turn(&id, "hello").await.unwrap_err();
        assert!(matches!(err, TurnError::Resolve(ResolveError::OracleUnavailable(_))));

        let thread = h.handler.thread(&id).await.unwrap();
        assert!(thread.state.is_empty());
        assert_eq!(thread.history.len(), 1);
        assert_eq!(thread.outcome, ThreadOutcome::InProgress);
    }

    #[tokio::test]
    async fn test_terminal_answer_sticks_without_oracle() {
        let h = harness();
        let id = h.handler.create_thread().await.thread_id;
        h.oracle.queue_text(answers(&[("kind", "Grant")]));

        let first = h.handler.handle_turn(&id, "a grant").await.unwrap();
        assert_eq!(first.status, TurnStatus::Terminated);
        assert_eq!(first.reply, GRANT_STOP);
        assert_eq!(first.workflow.instructions.as_deref(), Some(GRANT_STOP));

        let again = h.handler.handle_turn(&id, "can I continue?").await.unwrap();
        assert_eq!(again.status, TurnStatus::Terminated);
        assert_eq!(again.reply, GRANT_STOP);
        assert_eq!(h.oracle.recorded_requests().len(), 1);

        let thread = h.handler.thread(&id).await.unwrap();
        assert_eq!(
            thread.outcome,
            ThreadOutcome::Terminated {
                step: Some("kind".to_string()),
                instructions: GRANT_STOP.to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_satisfied_workflow_hands_off_to_advisor() {
        let h = harness();
        let id = h.handler.create_thread().await.thread_id;
        h.oracle
            .queue_text(answers(&[("kind", "Procurement"), ("value", "LOW")]));
        h.advisor.queue_text("Use the standard template.");
        h.advisor.queue_text("Yes, that is fine.");

        let done = h.handler.handle_turn(&id, "cheap pens").await.unwrap();
        assert_eq!(done.status, TurnStatus::Answered);
        assert_eq!(done.reply, "Use the standard template.");
        assert!(done.workflow.complete);
        assert!(done.workflow.next_question.is_none());

        let follow_up = h.handler.handle_turn(&id, "Is that all?").await.unwrap();
        assert_eq!(follow_up.status, TurnStatus::Answered);
        assert_eq!(follow_up.reply, "Yes, that is fine.");

        // only the first turn consulted the oracle
        assert_eq!(h.oracle.recorded_requests().len(), 1);
        let advisor_request = &h.advisor.recorded_requests()[1];
        assert!(advisor_request.messages[0].text.contains("How much? LOW"));
    }

    #[tokio::test]
    async fn test_advisor_failure_commits_nothing() {
        let h = harness();
        let id = h.handler.create_thread().await.thread_id;
        h.oracle
            .queue_text(answers(&[("kind", "Procurement"), ("value", "LOW")]));
        h.advisor.queue_error(LlmError::auth("bad key"));

        let err = h.handler.handle_turn(&id, "cheap pens").await.unwrap_err();
        assert!(matches!(err, TurnError::Advisor(_)));

        let thread = h.handler.thread(&id).await.unwrap();
        assert!(thread.state.is_empty());
        assert_eq!(thread.outcome, ThreadOutcome::InProgress);
    }

    #[tokio::test]
    async fn test_non_terminal_instruction_becomes_note() {
        let h = harness();
        let id = h.handler.create_thread().await.thread_id;
        h.oracle.queue_text(answers(&[("value", "MID")]));

        let reply = h.handler.handle_turn(&id, "around 100k").await.unwrap();

        assert_eq!(reply.status, TurnStatus::Question);
        assert_eq!(reply.workflow.notes, vec![QUOTES_NOTE.to_string()]);
        assert_eq!(reply.reply, format!("{QUOTES_NOTE}\n\nProcurement or grant?"));
    }

    #[tokio::test]
    async fn test_rejects_empty_message_and_unknown_thread() {
        let h = harness();
        let id = h.handler.create_thread().await.thread_id;

        assert!(matches!(
            h.handler.handle_turn(&id, "   ").await,
            Err(TurnError::EmptyMessage)
        ));
        assert!(matches!(
            h.handler.handle_turn("nope", "hi").await,
            Err(TurnError::UnknownThread(_))
        ));
        assert!(h.oracle.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn test_ended_thread_is_gone() {
        let h = harness();
        let id = h.handler.create_thread().await.thread_id;

        h.handler.end_thread(&id).await.unwrap();

        assert!(h.handler.thread(&id).await.is_none());
        assert!(matches!(
            h.handler.handle_turn(&id, "hi").await,
            Err(TurnError::UnknownThread(_))
        ));
        assert!(matches!(
            h.handler.end_thread(&id).await,
            Err(TurnError::UnknownThread(_))
        ));
        assert!(h.oracle.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_turns_on_one_thread_are_serialized() {
        let h = harness();
        let id = h.handler.create_thread().await.thread_id;
        h.oracle.queue_text(answers(&[]));
        h.oracle.queue_text(answers(&[]));

        let a = tokio::spawn({
            let handler = h.handler.clone();
            let id = id.clone();
            async move { handler.handle_turn(&id, "one").await }
        });
        let b = tokio::spawn({
            let handler = h.handler.clone();
            let id = id.clone();
            async move { handler.handle_turn(&id, "two").await }
        });
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let thread = h.handler.thread(&id).await.unwrap();
        assert_eq!(thread.history.len(), 5);
        // each user message is directly followed by its own reply
        assert_eq!(thread.history[1].role, crate::workflow::ChatRole::User);
        assert_eq!(thread.history[2].role, crate::workflow::ChatRole::Bot);
        assert_eq!(thread.history[3].role, crate::workflow::ChatRole::User);
    }
}
