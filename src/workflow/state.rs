//! Answer state, extraction results and chat history

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Accumulated answers keyed by step id
///
/// Owned by the caller and handed back in on every turn. Entries are only
/// ever added or overwritten.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowState(BTreeMap<String, String>);

impl WorkflowState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, step_id: &str) -> Option<&str> {
        self.0.get(step_id).map(String::as_str)
    }

    /// A step counts as answered when it has a non-empty entry, whether or
    /// not the value is one of its allowed answers.
    pub fn is_answered(&self, step_id: &str) -> bool {
        self.get(step_id).is_some_and(|answer| !answer.is_empty())
    }

    pub fn insert(&mut self, step_id: impl Into<String>, answer: impl Into<String>) {
        self.0.insert(step_id.into(), answer.into());
    }

    /// Overlay `extraction` on top of this state; extracted values always win.
    #[must_use]
    pub fn merge(&self, extraction: &ExtractionResult) -> Self {
        let mut merged = self.clone();
        for (step_id, answer) in extraction.iter() {
            merged.insert(step_id, answer);
        }
        merged
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for WorkflowState {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Answers newly proposed by the oracle for a single turn
///
/// Meant for steps missing from the current state, but proposals for
/// answered steps are carried through and overwrite on merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractionResult(BTreeMap<String, String>);

impl ExtractionResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, step_id: &str) -> Option<&str> {
        self.0.get(step_id).map(String::as_str)
    }

    pub fn insert(&mut self, step_id: impl Into<String>, answer: impl Into<String>) {
        self.0.insert(step_id.into(), answer.into());
    }

    /// Keep only proposals whose step id satisfies `keep`
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.0.retain(|step_id, _| keep(step_id));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ExtractionResult {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Speaker of a chat history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    Bot,
    User,
}

impl ChatRole {
    pub fn label(self) -> &'static str {
        match self {
            ChatRole::Bot => "bot",
            ChatRole::User => "user",
        }
    }
}

/// One entry of the conversation so far
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub contents: String,
}

impl ChatMessage {
    pub fn bot(contents: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Bot,
            contents: contents.into(),
        }
    }

    pub fn user(contents: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            contents: contents.into(),
        }
    }
}

pub type ChatHistory = Vec<ChatMessage>;
