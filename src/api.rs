//! HTTP API over the chat-turn handler

mod handlers;
mod types;

pub use handlers::create_router;
pub use types::*;

use crate::conversation::ChatTurnHandler;
use crate::llm::ModelRegistry;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub turns: Arc<ChatTurnHandler>,
    pub llm_registry: Arc<ModelRegistry>,
}

impl AppState {
    pub fn new(turns: ChatTurnHandler, llm_registry: Arc<ModelRegistry>) -> Self {
        Self {
            turns: Arc::new(turns),
            llm_registry,
        }
    }
}
