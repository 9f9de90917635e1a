//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! Every section is optional; missing keys take their defaults. Conversion
//! into domain types happens in [`FileConfig::validate`] and the per-section
//! `to_*` methods.

mod agent;
mod logging;
mod ollama;
mod safety;
mod shell;

pub use agent::FileAgentConfig;
pub use logging::FileLoggingConfig;
pub use ollama::FileOllamaConfig;
pub use safety::FileSafetyConfig;
pub use shell::FileShellConfig;

use crate::safety::FilterError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error)]
pub enum ConfigValidationError {
    #[error("{0} cannot be 0")]
    InvalidTimeout(&'static str),

    #[error("ollama.base_url must start with http:// or https:// (got '{0}')")]
    InvalidBaseUrl(String),

    #[error("agent.require_approval_for: unknown risk level '{0}'")]
    InvalidRiskLevel(String),

    #[error("agent.clarification: unknown policy '{0}' (expected 'surface' or 'answer_directly')")]
    InvalidClarification(String),

    #[error("agent: {0}")]
    Agent(String),

    #[error(transparent)]
    InvalidPattern(#[from] FilterError),
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Orchestrator settings
    pub agent: FileAgentConfig,
    /// Model server settings
    pub ollama: FileOllamaConfig,
    /// Command filter settings
    pub safety: FileSafetyConfig,
    /// Shell tool settings
    pub shell: FileShellConfig,
    /// Log destinations
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the entire configuration, stopping at the first problem.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        self.agent.to_agent_config()?;
        self.ollama.validate()?;
        self.safety.to_command_filter()?;
        if self.shell.timeout_secs == 0 {
            return Err(ConfigValidationError::InvalidTimeout("shell.timeout_secs"));
        }
        Ok(())
    }
}
