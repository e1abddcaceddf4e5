//! Extraction prompt construction

use crate::workflow::{ChatMessage, StepDefinition, WorkflowDefinition, WorkflowState};
use std::fmt::Write;

const PREAMBLE: &str = "You read a conversation between a procurement assistant (bot) and a requester (user) and determine answers to a fixed questionnaire. You never invent answers the conversation does not support.";

const GENERAL_RULES: &[&str] = &[
    "Only answer a step when the conversation or the new message clearly supports it.",
    "Use exactly one of the step's allowed answers, spelled exactly as listed.",
    "Only report steps from the unanswered list unless the user explicitly corrects an earlier answer.",
];

const OUTPUT_FORMAT: &str = r#"Reply with the newly determined answers in exactly this format:
<NewAnswers>
<Answer step="STEP_ID">ANSWER</Answer>
</NewAnswers>
Put one <Answer> element per step. If nothing new can be determined, reply with <NewAnswers></NewAnswers>."#;

/// Build the extraction prompt.
///
/// All current answers are listed, but only `remaining` steps are offered
/// for answering.
pub fn build_extraction_prompt(
    definition: &WorkflowDefinition,
    current_state: &WorkflowState,
    remaining: &[&StepDefinition],
    chat_history: &[ChatMessage],
    user_message: &str,
) -> String {
    let mut prompt = String::with_capacity(2048);

    let _ = writeln!(prompt, "{PREAMBLE}");
    let _ = writeln!(prompt, "Questionnaire: {}", definition.name());

    prompt.push_str("\nCurrent answers:\n");
    if current_state.is_empty() {
        prompt.push_str("(none yet)\n");
    }
    for (step_id, answer) in current_state.iter() {
        let _ = writeln!(prompt, "- {step_id}: {answer}");
    }

    prompt.push_str("\nUnanswered steps:\n");
    if remaining.is_empty() {
        prompt.push_str("(all steps answered)\n");
    }
    for step in remaining {
        let allowed = step
            .allowed_answers
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" | ");
        let _ = writeln!(prompt, "- id: {}", step.id);
        let _ = writeln!(prompt, "  question: {}", step.question);
        let _ = writeln!(prompt, "  allowed answers: {allowed}");
    }

    prompt.push_str("\nRules:\n");
    for rule in GENERAL_RULES
        .iter()
        .copied()
        .chain(definition.inference_rules().iter().map(String::as_str))
    {
        let _ = writeln!(prompt, "- {rule}");
    }

    prompt.push_str("\nConversation so far:\n");
    if chat_history.is_empty() {
        prompt.push_str("(no previous messages)\n");
    }
    for message in chat_history {
        let _ = writeln!(prompt, "{}: {}", message.role.label(), message.contents);
    }

    let _ = writeln!(prompt, "\nNew user message:\n{user_message}\n");
    prompt.push_str(OUTPUT_FORMAT);
    prompt
}
