//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Parley Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[context]
# max_tokens = 8000              # 256-2000000
# near_limit_threshold = 0.80    # informational band, 0.0-1.0
# critical_threshold = 0.95      # must be above near_limit_threshold
# chars_per_token = 4            # 1-16
# per_message_overhead = 4
# image_token_cost = 85

[tools]
# call_timeout_secs = 30         # 1-600, backstop per tool call
# max_tool_rounds = 8            # 1-64
# disabled = []                  # e.g. ["web_search"]

[session]
# system_prompt = "You are a concise, helpful assistant."
# auto_title_chars = 40          # 8-200
# storage_dir = ""               # empty = platform data dir
# history_limit = 200

[logging]
# level = "INFO"                 # DEBUG, INFO, WARNING, ERROR
"##
    .to_string()
}
