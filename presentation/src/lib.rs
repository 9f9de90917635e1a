//! Presentation layer for devops-agent
//!
//! This crate contains the CLI definition, console formatting, the
//! terminal approval prompt and the interactive chat REPL.

pub mod approval;
pub mod chat;
pub mod cli;
pub mod output;

// Re-export commonly used types
pub use approval::{InteractiveApproval, parse_decision};
pub use chat::{ChatRepl, ReplCommand};
pub use cli::commands::Cli;
pub use output::console::ConsoleFormatter;
