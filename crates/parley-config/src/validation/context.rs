//! Validation for the context budget section.

use crate::schema::ParleyConfig;

use super::helpers::{validate_range, validate_range_f64};

pub(crate) fn validate_context(errors: &mut Vec<String>, config: &ParleyConfig) {
    let ctx = &config.context;
    validate_range(errors, "context.max_tokens", ctx.max_tokens, 256, 2_000_000);
    validate_range(errors, "context.chars_per_token", ctx.chars_per_token, 1, 16);
    validate_range(
        errors,
        "context.per_message_overhead",
        ctx.per_message_overhead,
        0,
        256,
    );
    validate_range(
        errors,
        "context.image_token_cost",
        ctx.image_token_cost,
        0,
        100_000,
    );
    validate_range_f64(
        errors,
        "context.near_limit_threshold",
        ctx.near_limit_threshold,
        0.0,
        1.0,
    );
    validate_range_f64(
        errors,
        "context.critical_threshold",
        ctx.critical_threshold,
        0.0,
        1.0,
    );
    if ctx.near_limit_threshold >= ctx.critical_threshold {
        errors.push(format!(
            "context.near_limit_threshold ({}) must be below context.critical_threshold ({})",
            ctx.near_limit_threshold, ctx.critical_threshold
        ));
    }
}
