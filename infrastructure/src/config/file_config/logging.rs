//! Logging configuration from TOML (`[logging]` section)

use serde::{Deserialize, Serialize};

/// Raw logging configuration from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Default `tracing` filter directive when `-v` is not given (e.g. "info")
    pub level: Option<String>,
    /// Diagnostic log file
    pub log_file: Option<String>,
    /// JSONL conversation transcript
    pub conversation_log: Option<String>,
}
