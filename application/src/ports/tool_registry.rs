//! Tool registry port

use super::tool::Tool;
use devops_agent_domain::ToolDescriptor;
use std::sync::Arc;

/// Lookup of registered tools by name
pub trait ToolRegistryPort: Send + Sync {
    /// Get a tool by name
    fn get(&self, name: &str) -> Option<Arc<dyn Tool>>;

    /// Catalog of every registered tool, sorted by name
    fn list_all(&self) -> Vec<ToolDescriptor>;

    /// Check if a tool is registered
    fn has_tool(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}
