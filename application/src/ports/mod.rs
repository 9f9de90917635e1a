//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure and presentation adapters
//! must implement.

pub mod approval;
pub mod conversation_logger;
pub mod llm_client;
pub mod tool;
pub mod tool_registry;
