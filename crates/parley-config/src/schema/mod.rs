//! Configuration schema types for Parley.
//!
//! All structs use `serde(default)` so partial configs work correctly.
//! Missing fields are filled with sensible defaults.

mod context;
mod session;
mod system;
mod tools;

pub use context::*;
pub use session::*;
pub use system::*;
pub use tools::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration for Parley.
///
/// Only override what you want to change.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ParleyConfig {
    pub context: ContextConfig,
    pub tools: ToolsConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_context_budget() {
        let config = ParleyConfig::default();
        assert_eq!(config.context.max_tokens, 8000);
        assert!((config.context.near_limit_threshold - 0.80).abs() < f64::EPSILON);
        assert!((config.context.critical_threshold - 0.95).abs() < f64::EPSILON);
        assert_eq!(config.context.chars_per_token, 4);
        assert_eq!(config.context.per_message_overhead, 4);
        assert_eq!(config.context.image_token_cost, 85);
    }

    #[test]
    fn default_config_has_tool_limits() {
        let config = ParleyConfig::default();
        assert_eq!(config.tools.call_timeout_secs, 30);
        assert_eq!(config.tools.max_tool_rounds, 8);
        assert!(config.tools.disabled.is_empty());
    }

    #[test]
    fn default_config_has_session_settings() {
        let config = ParleyConfig::default();
        assert!(config.session.system_prompt.is_none());
        assert_eq!(config.session.auto_title_chars, 40);
        assert_eq!(config.session.history_limit, 200);
        assert!(config.session.storage_dir.is_none());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let toml_str = r#"
[context]
max_tokens = 32000
"#;
        let config: ParleyConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.context.max_tokens, 32000);
        assert_eq!(config.context.chars_per_token, 4);
        assert_eq!(config.tools.max_tool_rounds, 8);
    }

    #[test]
    fn empty_toml_is_default() {
        let config: ParleyConfig = toml::from_str("").unwrap();
        assert_eq!(config.context.max_tokens, 8000);
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn log_level_parses_uppercase() {
        let config: ParleyConfig = toml::from_str("[logging]\nlevel = \"DEBUG\"\n").unwrap();
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.level.as_directive(), "debug");
    }

    #[test]
    fn disabled_tools_parse() {
        let config: ParleyConfig =
            toml::from_str("[tools]\ndisabled = [\"web_search\", \"timer\"]\n").unwrap();
        assert_eq!(config.tools.disabled, vec!["web_search", "timer"]);
        assert!(config.tools.is_disabled("timer"));
        assert!(!config.tools.is_disabled("weather"));
    }
}
