//! Tool result registry.
//!
//! Maps a tool name to a pure parser that turns the tool's raw JSON
//! payload into a typed [`ToolResult`]. Parsing never fails loudly:
//! malformed JSON, unknown tools, and payloads flagged with
//! `"error": true` all yield `None`, and the caller falls back to a
//! generic status display.

mod builtins;
mod fields;
mod types;


use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use serde_json::Value;
use tracing::debug;

pub use types::*;

/// A pure parse function from a tool's JSON payload to a typed result.
pub type ResultParser = Arc<dyn Fn(&Value) -> Option<ToolResult> + Send + Sync>;

/// Lookup table from tool name to result parser. Holds no conversation
/// state, so one instance can be shared by every session.
#[derive(Clone, Default)]
pub struct ToolResultRegistry {
    parsers: HashMap<String, ResultParser>,
}

impl ToolResultRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with parsers for every built-in tool.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtins::install(&mut registry);
        registry
    }

    /// Process-wide registry, seeded with the built-in parsers.
    pub fn global() -> &'static RwLock<ToolResultRegistry> {
        static GLOBAL: OnceLock<RwLock<ToolResultRegistry>> = OnceLock::new();
        GLOBAL.get_or_init(|| RwLock::new(ToolResultRegistry::with_builtins()))
    }

    /// Register `parser` for `tool_name`. Re-registering a name replaces
    /// the previous parser.
    pub fn register<F>(&mut self, tool_name: impl Into<String>, parser: F)
    where
        F: Fn(&Value) -> Option<ToolResult> + Send + Sync + 'static,
    {
        self.parsers.insert(tool_name.into(), Arc::new(parser));
    }

    pub fn unregister(&mut self, tool_name: &str) -> bool {
        self.parsers.remove(tool_name).is_some()
    }

    pub fn is_registered(&self, tool_name: &str) -> bool {
        self.parsers.contains_key(tool_name)
    }

    pub fn tool_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.parsers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Parse a raw JSON payload produced by `tool_name`.
    pub fn parse(&self, tool_name: &str, raw_json: &str) -> Option<ToolResult> {
        let value: Value = match serde_json::from_str(raw_json) {
            Ok(v) => v,
            Err(e) => {
                debug!(tool = %tool_name, error = %e, "Tool result is not valid JSON");
                return None;
            }
        };
        self.parse_value(tool_name, &value)
    }

    /// Parse an already-decoded payload. The error-flag gate applies to
    /// every parser, including ones registered at runtime.
    pub fn parse_value(&self, tool_name: &str, value: &Value) -> Option<ToolResult> {
        let parser = self.parsers.get(tool_name)?;
        if is_error_payload(value) {
            debug!(tool = %tool_name, "Tool result carries an error flag");
            return None;
        }
        parser(value)
    }
}

impl std::fmt::Debug for ToolResultRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolResultRegistry")
            .field("tools", &self.tool_names())
            .finish()
    }
}

/// `true` for objects carrying `"error": true`.
pub fn is_error_payload(value: &Value) -> bool {
    value.get("error").and_then(Value::as_bool).unwrap_or(false)
}
