//! Shell tool configuration from TOML (`[shell]` section)

use serde::{Deserialize, Serialize};

/// Raw shell tool configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileShellConfig {
    /// Register the shell tool
    pub enabled: bool,
    /// Default per-command timeout in seconds
    pub timeout_secs: u64,
}

impl Default for FileShellConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: 60,
        }
    }
}
