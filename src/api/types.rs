//! API request and response types

use crate::conversation::Thread;
use crate::llm::ModelInfo;
use crate::workflow::WorkflowDefinition;
use serde::{Deserialize, Serialize};

/// Request to run one chat turn
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Response with a thread snapshot
#[derive(Debug, Serialize)]
pub struct ThreadResponse {
    pub thread: Thread,
}

/// Response with the active workflow definition
#[derive(Debug, Serialize)]
pub struct WorkflowResponse {
    pub workflow: WorkflowDefinition,
}

/// Response with the registered models
#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelInfo>,
    pub default: String,
}

/// Error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
