//! Tests for TOML config loading, creation, and path resolution.

use super::*;
use std::path::Path;

#[test]
fn load_from_nonexistent_returns_file_not_found() {
    let result = load_from_path(Path::new("/tmp/nonexistent_parley_config.toml"));
    let err = result.unwrap_err();
    assert!(matches!(err, parley_common::ConfigError::FileNotFound(_)));
}

#[test]
fn load_valid_partial_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r##"
[context]
max_tokens = 16000

[session]
system_prompt = "Be brief."
"##,
    )
    .unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.context.max_tokens, 16000);
    assert_eq!(config.session.system_prompt.as_deref(), Some("Be brief."));
    // Defaults preserved
    assert_eq!(config.context.chars_per_token, 4);
    assert_eq!(config.tools.call_timeout_secs, 30);
}

#[test]
fn load_invalid_toml_returns_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "this is not valid toml {{{").unwrap();

    let err = load_from_path(&path).unwrap_err();
    assert!(matches!(err, parley_common::ConfigError::ParseError(_)));
}

#[test]
fn load_config_with_invalid_values_is_returned_as_parsed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[context]\nmax_tokens = 10\n").unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.context.max_tokens, 10);
}

#[test]
fn create_and_load_default_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("parley").join("config.toml");

    create_default_config(&path).unwrap();
    assert!(path.exists());

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.context.max_tokens, 8000);
}

#[test]
fn default_config_toml_is_valid() {
    use super::template::default_config_toml;
    use crate::schema::ParleyConfig;

    let config: ParleyConfig = toml::from_str(&default_config_toml()).unwrap();
    assert!(crate::validation::validate(&config).is_ok());
}

#[test]
fn default_paths_are_reasonable() {
    // Platform dirs may be unavailable in some CI sandboxes.
    if let Ok(path) = default_config_path() {
        let path_str = path.to_string_lossy();
        assert!(path_str.contains("parley"));
        assert!(path_str.ends_with("config.toml"));
    }
    if let Ok(dir) = default_sessions_dir() {
        assert!(dir.ends_with("sessions"));
    }
}
