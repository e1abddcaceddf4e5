//! Process configuration from environment variables

use crate::llm::LlmConfig;
use crate::workflow::{procurement, DefinitionError, WorkflowDefinition};
use std::path::{Path, PathBuf};
use thiserror::Error;

const DEFAULT_PORT: u16 = 8000;
const AUDIT_DISABLED: &str = "off";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read workflow definition {path}: {source}")]
    ReadWorkflow {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid workflow definition: {0}")]
    Definition(#[from] DefinitionError),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// `None` when auditing is switched off
    pub audit_log: Option<PathBuf>,
    /// JSON definition replacing the built-in questionnaire
    pub workflow_path: Option<PathBuf>,
    pub oracle_model: Option<String>,
    pub advisor_model: Option<String>,
    pub llm: LlmConfig,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = var("INTAKE_PORT")
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let audit_log = match var("INTAKE_AUDIT_LOG") {
            Some(value) if value.trim().eq_ignore_ascii_case(AUDIT_DISABLED) => None,
            Some(value) => Some(PathBuf::from(value)),
            None => {
                let home = var("HOME").unwrap_or_else(|| "/tmp".to_string());
                Some(Path::new(&home).join(".intake-engine").join("audit.jsonl"))
            }
        };

        Self {
            port,
            audit_log,
            workflow_path: var("INTAKE_WORKFLOW_PATH").map(PathBuf::from),
            oracle_model: var("INTAKE_ORACLE_MODEL"),
            advisor_model: var("INTAKE_ADVISOR_MODEL"),
            llm: LlmConfig::from_lookup(&lookup),
        }
    }

    /// Load and validate the active workflow definition.
    pub fn load_workflow(&self) -> Result<WorkflowDefinition, ConfigError> {
        let Some(path) = &self.workflow_path else {
            return Ok(procurement::definition()?);
        };
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadWorkflow {
            path: path.clone(),
            source,
        })?;
        Ok(WorkflowDefinition::from_json(&json)?)
    }
}
