//! Tests for the full validation pipeline.

use super::*;

#[test]
fn default_config_validates() {
    assert!(validate(&ParleyConfig::default()).is_ok());
}

#[test]
fn catches_max_tokens_too_small() {
    let mut config = ParleyConfig::default();
    config.context.max_tokens = 100;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("context.max_tokens"));
}

#[test]
fn catches_chars_per_token_zero() {
    let mut config = ParleyConfig::default();
    config.context.chars_per_token = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("context.chars_per_token"));
}

#[test]
fn catches_threshold_out_of_range() {
    let mut config = ParleyConfig::default();
    config.context.critical_threshold = 1.5;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("context.critical_threshold"));
}

#[test]
fn catches_inverted_thresholds() {
    let mut config = ParleyConfig::default();
    config.context.near_limit_threshold = 0.96;
    config.context.critical_threshold = 0.90;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("must be below"));
}

#[test]
fn catches_zero_tool_timeout() {
    let mut config = ParleyConfig::default();
    config.tools.call_timeout_secs = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("tools.call_timeout_secs"));
}

#[test]
fn catches_blank_disabled_tool() {
    let mut config = ParleyConfig::default();
    config.tools.disabled = vec!["  ".into()];
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("empty tool name"));
}

#[test]
fn catches_title_length_out_of_range() {
    let mut config = ParleyConfig::default();
    config.session.auto_title_chars = 2;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("session.auto_title_chars"));
}

#[test]
fn collects_multiple_errors() {
    let mut config = ParleyConfig::default();
    config.context.max_tokens = 1;
    config.tools.max_tool_rounds = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("context.max_tokens"));
    assert!(err.contains("tools.max_tool_rounds"));
    assert!(err.contains("; "));
}
