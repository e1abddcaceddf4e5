//! Ordered decision workflow driven by extracted answers
//!
//! A [`WorkflowDefinition`] is a fixed, ordered list of steps. Each turn the
//! [`WorkflowResolver`] merges freshly extracted answers into the caller-owned
//! [`WorkflowState`] and decides whether the workflow terminated, completed,
//! or which question to ask next.

pub mod procurement;
mod resolver;
mod state;
mod step;

#[cfg(test)]
mod proptests;

pub use resolver::{evaluate, ResolutionResult, ResolveError, WorkflowResolver};
pub use state::{ChatHistory, ChatMessage, ChatRole, ExtractionResult, WorkflowState};
pub use step::{DefinitionError, StepDefinition, WorkflowDefinition};
