//! Configuration file loading for devops-agent
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `DEVOPS_AGENT_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./devops-agent.toml` or `./.devops-agent.toml`
//! 4. Global: `~/.config/devops-agent/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileAgentConfig, FileConfig, FileLoggingConfig, FileOllamaConfig,
    FileSafetyConfig, FileShellConfig,
};
pub use loader::{ConfigLoader, ENV_PREFIX};
