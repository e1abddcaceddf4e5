//! Scripted oracle for tests

use super::{AnswerExtractionOracle, OracleRequest, OracleResponse};
use crate::llm::LlmError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays queued replies in order and records every request
#[derive(Default)]
pub struct MockOracle {
    replies: Mutex<VecDeque<Result<OracleResponse, LlmError>>>,
    requests: Mutex<Vec<OracleRequest>>,
}

impl MockOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_text(&self, text: impl Into<String>) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(OracleResponse { text: text.into() }));
    }

    pub fn queue_error(&self, error: LlmError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_requests(&self) -> Vec<OracleRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnswerExtractionOracle for MockOracle {
    async fn generate(&self, request: &OracleRequest) -> Result<OracleResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No oracle reply queued")))
    }
}
