//! Property-based tests for merge and resolution
//!
//! These tests verify the ordering invariants hold for arbitrary
//! definitions and states.

use super::*;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

const ANSWERS: &[&str] = &["A", "B", "C"];

fn step_id(index: usize) -> String {
    format!("s{index}")
}

/// Each step allows A/B/C and marks a random subset of them terminal
fn arb_definition() -> impl Strategy<Value = WorkflowDefinition> {
    proptest::collection::vec(proptest::collection::vec(any::<bool>(), 3), 1..8).prop_map(
        |terminal_flags| {
            let steps = terminal_flags
                .iter()
                .enumerate()
                .map(|(index, flags)| {
                    let mut step = StepDefinition::new(step_id(index), format!("Question {index}?"))
                        .allow(ANSWERS.iter().copied());
                    for (answer, is_terminal) in ANSWERS.iter().zip(flags) {
                        if *is_terminal {
                            step = step.terminal(*answer, format!("stop at {index} on {answer}"));
                        }
                    }
                    step
                })
                .collect();
            WorkflowDefinition::new("prop", "1", steps).unwrap()
        },
    )
}

/// Values include off-list answers and empty strings
fn arb_answer() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("A".to_string()),
        Just("B".to_string()),
        Just("C".to_string()),
        Just("Z".to_string()),
        Just(String::new()),
    ]
}

fn arb_pairs() -> impl Strategy<Value = Vec<(String, String)>> {
    proptest::collection::vec(((0usize..10).prop_map(step_id), arb_answer()), 0..10)
}

fn arb_state() -> impl Strategy<Value = WorkflowState> {
    arb_pairs().prop_map(|pairs| pairs.into_iter().collect())
}

fn arb_extraction() -> impl Strategy<Value = ExtractionResult> {
    arb_pairs().prop_map(|pairs| pairs.into_iter().collect())
}

fn first_terminal<'a>(definition: &'a WorkflowDefinition, state: &WorkflowState) -> Option<&'a StepDefinition> {
    definition
        .steps()
        .iter()
        .find(|step| state.get(&step.id).is_some_and(|answer| step.is_terminal(answer)))
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn merge_prefers_extraction(state in arb_state(), extraction in arb_extraction()) {
        let merged = state.merge(&extraction);
        for (step_id, answer) in extraction.iter() {
            prop_assert_eq!(merged.get(step_id), Some(answer));
        }
        for (step_id, answer) in state.iter() {
            if extraction.get(step_id).is_none() {
                prop_assert_eq!(merged.get(step_id), Some(answer));
            }
        }
        // nothing appears from nowhere
        for (step_id, _) in merged.iter() {
            prop_assert!(state.get(step_id).is_some() || extraction.get(step_id).is_some());
        }
    }

    #[test]
    fn evaluate_is_deterministic(definition in arb_definition(), state in arb_state()) {
        prop_assert_eq!(evaluate(&definition, state.clone()), evaluate(&definition, state));
    }

    #[test]
    fn earliest_terminal_step_wins(definition in arb_definition(), state in arb_state()) {
        let expected = first_terminal(&definition, &state).map(|step| step.id.clone());
        let result = evaluate(&definition, state);

        prop_assert_eq!(&result.terminal_step, &expected);
        if let Some(step_id) = expected {
            let step = definition.step(&step_id).unwrap();
            let answer = result.updated_state.get(&step_id).unwrap();
            prop_assert!(result.complete);
            prop_assert_eq!(result.instructions.as_deref(), step.instructions_for(answer));
            prop_assert_eq!(&result.next_question, &result.instructions);
        }
    }

    #[test]
    fn next_question_is_first_unanswered(definition in arb_definition(), state in arb_state()) {
        prop_assume!(first_terminal(&definition, &state).is_none());
        let first_unanswered = definition
            .steps()
            .iter()
            .find(|step| !state.is_answered(&step.id))
            .map(|step| step.question.clone());

        let result = evaluate(&definition, state);

        prop_assert!(result.instructions.is_none());
        match first_unanswered {
            Some(question) => {
                prop_assert!(!result.complete);
                prop_assert_eq!(result.next_question, Some(question));
            }
            None => {
                prop_assert!(result.complete);
                prop_assert!(result.next_question.is_none());
            }
        }
    }

    #[test]
    fn empty_extraction_is_idempotent(definition in arb_definition(), state in arb_state()) {
        let merged = state.merge(&ExtractionResult::new());
        prop_assert_eq!(&merged, &state);

        let once = evaluate(&definition, merged);
        let twice = evaluate(&definition, once.updated_state.merge(&ExtractionResult::new()));
        prop_assert_eq!(once, twice);
    }
}
