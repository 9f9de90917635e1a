//! Prompt templates
//!
//! - [`AgentPromptTemplate`]: system, planning and synthesis prompts

pub mod agent;

pub use agent::AgentPromptTemplate;
