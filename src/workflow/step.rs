//! Step schema and definition validation

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use thiserror::Error;

/// Errors found while validating a workflow definition
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("Workflow definition has no steps")]
    NoSteps,
    #[error("Step at position {0} has an empty id")]
    EmptyId(usize),
    #[error("Step {0} has an empty question")]
    EmptyQuestion(String),
    #[error("Step {0} has no allowed answers")]
    NoAllowedAnswers(String),
    #[error("Duplicate step id: {0}")]
    DuplicateId(String),
    #[error("Step {step}: terminal answer {answer:?} is not an allowed answer")]
    TerminalNotAllowed { step: String, answer: String },
    #[error("Step {step}: instructions given for {answer:?}, which is not an allowed answer")]
    InstructionNotAllowed { step: String, answer: String },
    #[error("Invalid workflow JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One node of the decision sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDefinition {
    pub id: String,
    pub question: String,
    pub allowed_answers: BTreeSet<String>,
    /// Guidance text keyed by answer
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub instructions: BTreeMap<String, String>,
    /// Answers that end the workflow early
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub terminal_answers: BTreeSet<String>,
}

impl StepDefinition {
    pub fn new(id: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            question: question.into(),
            allowed_answers: BTreeSet::new(),
            instructions: BTreeMap::new(),
            terminal_answers: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn allow<I, S>(mut self, answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_answers.extend(answers.into_iter().map(Into::into));
        self
    }

    /// Guidance attached to an answer without ending the workflow
    #[must_use]
    pub fn instruction(mut self, answer: impl Into<String>, text: impl Into<String>) -> Self {
        self.instructions.insert(answer.into(), text.into());
        self
    }

    /// Mark `answer` as terminal, surfacing `text` when it is given
    #[must_use]
    pub fn terminal(mut self, answer: impl Into<String>, text: impl Into<String>) -> Self {
        let answer = answer.into();
        self.terminal_answers.insert(answer.clone());
        self.instructions.insert(answer, text.into());
        self
    }

    pub fn is_terminal(&self, answer: &str) -> bool {
        self.terminal_answers.contains(answer)
    }

    pub fn instructions_for(&self, answer: &str) -> Option<&str> {
        self.instructions.get(answer).map(String::as_str)
    }

    fn validate(&self, position: usize) -> Result<(), DefinitionError> {
        if self.id.trim().is_empty() {
            return Err(DefinitionError::EmptyId(position));
        }
        if self.question.trim().is_empty() {
            return Err(DefinitionError::EmptyQuestion(self.id.clone()));
        }
        if self.allowed_answers.is_empty() {
            return Err(DefinitionError::NoAllowedAnswers(self.id.clone()));
        }
        if let Some(answer) = self.terminal_answers.difference(&self.allowed_answers).next() {
            return Err(DefinitionError::TerminalNotAllowed {
                step: self.id.clone(),
                answer: answer.clone(),
            });
        }
        if let Some(answer) = self
            .instructions
            .keys()
            .find(|answer| !self.allowed_answers.contains(*answer))
        {
            return Err(DefinitionError::InstructionNotAllowed {
                step: self.id.clone(),
                answer: answer.clone(),
            });
        }
        Ok(())
    }
}

/// Validated, ordered sequence of steps
///
/// Order is the single source of truth for terminal precedence and for
/// picking the next unanswered step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawDefinition", rename_all = "camelCase")]
pub struct WorkflowDefinition {
    name: String,
    version: String,
    steps: Vec<StepDefinition>,
    /// Domain rules handed to the oracle verbatim
    #[serde(skip_serializing_if = "Vec::is_empty")]
    inference_rules: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDefinition {
    name: String,
    #[serde(default = "default_version")]
    version: String,
    steps: Vec<StepDefinition>,
    #[serde(default)]
    inference_rules: Vec<String>,
}

fn default_version() -> String {
    "1".to_string()
}

impl TryFrom<RawDefinition> for WorkflowDefinition {
    type Error = DefinitionError;

    fn try_from(raw: RawDefinition) -> Result<Self, Self::Error> {
        Self::new(raw.name, raw.version, raw.steps)
            .map(|def| def.with_inference_rules(raw.inference_rules))
    }
}

impl WorkflowDefinition {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        steps: Vec<StepDefinition>,
    ) -> Result<Self, DefinitionError> {
        if steps.is_empty() {
            return Err(DefinitionError::NoSteps);
        }

        let mut seen = HashSet::new();
        for (position, step) in steps.iter().enumerate() {
            step.validate(position)?;
            if !seen.insert(step.id.as_str()) {
                return Err(DefinitionError::DuplicateId(step.id.clone()));
            }
        }

        Ok(Self {
            name: name.into(),
            version: version.into(),
            steps,
            inference_rules: Vec::new(),
        })
    }

    /// Load and validate a definition from JSON
    pub fn from_json(json: &str) -> Result<Self, DefinitionError> {
        let raw: RawDefinition = serde_json::from_str(json)?;
        Self::try_from(raw)
    }

    #[must_use]
    pub fn with_inference_rules<I, S>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inference_rules.extend(rules.into_iter().map(Into::into));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    pub fn inference_rules(&self) -> &[String] {
        &self.inference_rules
    }

    pub fn step(&self, id: &str) -> Option<&StepDefinition> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn contains_step(&self, id: &str) -> bool {
        self.step(id).is_some()
    }

    pub fn first_question(&self) -> Option<&str> {
        self.steps.first().map(|s| s.question.as_str())
    }
}
