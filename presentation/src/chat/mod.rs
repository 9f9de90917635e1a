//! Interactive chat module
//!
//! Provides a reedline-based chat interface for the agent.

mod repl;

pub use repl::{ChatRepl, ReplCommand};
