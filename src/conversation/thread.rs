//! In-memory chat threads

use crate::workflow::{ChatHistory, ChatMessage, WorkflowState};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Where a thread stands with respect to the workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ThreadOutcome {
    /// Still collecting answers
    InProgress,
    /// A terminal answer stopped the workflow
    Terminated {
        step: Option<String>,
        instructions: String,
    },
    /// Every step answered; follow-ups go to the advisor
    Satisfied,
}

#[derive(Debug, Clone, Serialize)]
pub struct Thread {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub state: WorkflowState,
    pub history: ChatHistory,
    pub outcome: ThreadOutcome,
}

impl Thread {
    fn new(opening: Option<&str>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            state: WorkflowState::new(),
            history: opening.map(ChatMessage::bot).into_iter().collect(),
            outcome: ThreadOutcome::InProgress,
        }
    }
}

/// Threads keyed by id, each behind its own lock
///
/// Holding a thread's lock for a whole turn serializes turns on that thread
/// while other threads proceed.
#[derive(Default)]
pub struct ThreadStore {
    threads: RwLock<HashMap<String, Arc<Mutex<Thread>>>>,
}

impl ThreadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a thread whose history opens with `opening` from the bot.
    pub async fn create(&self, opening: Option<&str>) -> Thread {
        let thread = Thread::new(opening);
        let snapshot = thread.clone();
        self.threads
            .write()
            .await
            .insert(thread.id.clone(), Arc::new(Mutex::new(thread)));
        snapshot
    }

    pub async fn get(&self, id: &str) -> Option<Arc<Mutex<Thread>>> {
        self.threads.read().await.get(id).cloned()
    }

    /// Drop a thread. A turn already holding its lock runs to completion
    /// but its result is not reachable afterwards.
    pub async fn remove(&self, id: &str) -> bool {
        self.threads.write().await.remove(id).is_some()
    }
}
