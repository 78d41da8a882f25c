//! Name-keyed collection of the tools available to a conversation.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::ToolSchema;

use super::Tool;

#[derive(Clone, Default)]
pub struct ToolSet {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its schema name, replacing any previous one.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.schema().name;
        tracing::debug!(tool = %name, "Registered tool");
        self.tools.insert(name, tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Schemas of all tools not listed in `disabled`, sorted by name.
    pub fn schemas(&self, disabled: &[String]) -> Vec<ToolSchema> {
        self.tools
            .iter()
            .filter(|(name, _)| !disabled.iter().any(|d| d == *name))
            .map(|(_, tool)| tool.schema())
            .collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSet")
            .field("tools", &self.names())
            .finish()
    }
}
