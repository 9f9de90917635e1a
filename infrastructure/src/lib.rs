//! Infrastructure layer for devops-agent
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod config;
pub mod logging;
pub mod ollama;
pub mod safety;
pub mod tools;

// Re-export commonly used types
pub use config::{
    ConfigLoader, ConfigValidationError, FileAgentConfig, FileConfig, FileLoggingConfig,
    FileOllamaConfig, FileSafetyConfig, FileShellConfig,
};
pub use logging::JsonlConversationLogger;
pub use ollama::{OllamaClient, OllamaError};
pub use safety::{FilterError, PatternCommandFilter};
pub use tools::{ShellTool, ToolRegistry};
