//! Full configuration validation.
//!
//! Validates all numeric ranges and threshold ordering. Each section has
//! its own validator; this function calls them all and collects errors
//! into a single `ConfigError`.

mod context;
mod helpers;
mod misc;

#[cfg(test)]
mod tests;

use crate::schema::ParleyConfig;
use parley_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &ParleyConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    context::validate_context(&mut errors, config);
    misc::validate_tools(&mut errors, config);
    misc::validate_session(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
