//! Validation for the tools and session sections.

use crate::schema::ParleyConfig;

use super::helpers::validate_range;

pub(crate) fn validate_tools(errors: &mut Vec<String>, config: &ParleyConfig) {
    validate_range(
        errors,
        "tools.call_timeout_secs",
        config.tools.call_timeout_secs,
        1,
        600,
    );
    validate_range(
        errors,
        "tools.max_tool_rounds",
        config.tools.max_tool_rounds,
        1,
        64,
    );
    if config.tools.disabled.iter().any(|name| name.trim().is_empty()) {
        errors.push("tools.disabled contains an empty tool name".to_string());
    }
}

pub(crate) fn validate_session(errors: &mut Vec<String>, config: &ParleyConfig) {
    validate_range(
        errors,
        "session.auto_title_chars",
        config.session.auto_title_chars,
        8,
        200,
    );
    validate_range(
        errors,
        "session.history_limit",
        config.session.history_limit,
        1,
        10_000,
    );
}
