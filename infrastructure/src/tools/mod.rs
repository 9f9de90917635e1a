//! Tool adapters
//!
//! - [`ToolRegistry`]: in-memory implementation of the registry port
//! - [`ShellTool`]: reference tool running command lines through `sh -c`

pub mod registry;
pub mod shell;

pub use registry::ToolRegistry;
pub use shell::ShellTool;
