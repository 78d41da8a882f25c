use std::sync::Arc;

use parley_ai::{CharRatioEstimator, ImageAttachment, Message};
use parley_config::schema::ContextConfig;

use super::*;

/// One token per character, no framing overhead.
fn window(max_tokens: usize) -> ContextWindow {
    let estimator = CharRatioEstimator::new(1).with_overhead(0).with_image_cost(50);
    ContextWindow::new(
        ContextWindowConfig {
            max_tokens,
            near_limit_threshold: 0.8,
            critical_threshold: 0.95,
        },
        Arc::new(estimator),
    )
}

fn text(n: usize) -> String {
    "x".repeat(n)
}

fn apply(messages: &mut Vec<Message>, decision: AdmissionDecision) {
    if let AdmissionDecision::Trim(n) = decision {
        let mut dropped = 0;
        messages.retain(|m| {
            if dropped < n && is_trimmable(m) {
                dropped += 1;
                false
            } else {
                true
            }
        });
    }
}

#[test]
fn stats_break_down_by_role() {
    let ctx = window(100);
    let mut tool = Message::tool_call("weather", "c1", text(3));
    tool.tool.as_mut().unwrap().raw_result = Some(text(7));
    let messages = vec![
        Message::system(text(5)),
        Message::user(text(10)),
        Message::assistant(text(20)),
        tool,
    ];
    let stats = ctx.stats(&messages);
    assert_eq!(stats.breakdown.system, 5);
    assert_eq!(stats.breakdown.user, 10);
    assert_eq!(stats.breakdown.assistant, 20);
    // "Using weather" + arguments + raw result
    assert_eq!(stats.breakdown.tool, 13 + 3 + 7);
    assert_eq!(stats.current_tokens, stats.breakdown.total());
    assert_eq!(stats.max_tokens, 100);
}

#[test]
fn images_have_flat_cost() {
    let ctx = window(1000);
    let msg = Message::user(text(4)).with_image(ImageAttachment {
        mime_type: "image/png".into(),
        bytes: vec![0; 4096],
    });
    assert_eq!(ctx.stats(&[msg]).current_tokens, 54);
}

#[test]
fn usage_percent_is_clamped() {
    let ctx = window(10);
    let stats = ctx.stats(&[Message::user(text(25))]);
    assert_eq!(stats.usage_percent(), 1.0);
    assert!(stats.is_over_budget());
    assert_eq!(stats.remaining(), 0);

    let empty = ctx.stats(&[]);
    assert_eq!(empty.usage_percent(), 0.0);
}

#[test]
fn bands_follow_thresholds() {
    let ctx = window(100);
    assert_eq!(ctx.band(&ctx.stats(&[Message::user(text(50))])), UsageBand::Normal);
    assert_eq!(ctx.band(&ctx.stats(&[Message::user(text(80))])), UsageBand::NearLimit);
    assert_eq!(ctx.band(&ctx.stats(&[Message::user(text(96))])), UsageBand::Critical);
}

#[test]
fn fits_without_trimming() {
    let ctx = window(100);
    let messages = vec![Message::user(text(40)), Message::assistant(text(40))];
    assert_eq!(ctx.admit(&Message::user(text(20)), &messages), AdmissionDecision::Ok);
}

#[test]
fn fourth_message_trims_oldest_unpinned() {
    let ctx = window(30);
    let first = Message::user(text(10));
    let mut messages = vec![
        first.clone(),
        Message::assistant(text(10)),
        Message::user(text(10)),
    ];
    let incoming = Message::user(text(5));

    let decision = ctx.admit(&incoming, &messages);
    assert_eq!(decision, AdmissionDecision::Trim(1));

    apply(&mut messages, decision);
    messages.push(incoming);
    let stats = ctx.stats(&messages);
    assert!(stats.current_tokens <= stats.max_tokens);
    assert!(messages.iter().all(|m| m.id != first.id));
}

#[test]
fn pinned_and_system_are_never_trimmed() {
    let ctx = window(40);
    let system = Message::system(text(5));
    let mut pinned = Message::user(text(10));
    pinned.pinned = true;
    let old = Message::assistant(text(10));
    let recent = Message::user(text(10));
    let mut messages = vec![system.clone(), pinned.clone(), old.clone(), recent];

    let decision = ctx.admit(&Message::assistant(text(10)), &messages);
    assert_eq!(decision, AdmissionDecision::Trim(1));
    apply(&mut messages, decision);

    assert!(messages.iter().any(|m| m.id == system.id));
    assert!(messages.iter().any(|m| m.id == pinned.id));
    assert!(messages.iter().all(|m| m.id != old.id));
}

#[test]
fn summarize_when_trimming_is_not_enough() {
    let ctx = window(30);
    let mut pinned = Message::user(text(20));
    pinned.pinned = true;
    let messages = vec![Message::system(text(5)), pinned, Message::assistant(text(4))];
    assert_eq!(
        ctx.admit(&Message::user(text(10)), &messages),
        AdmissionDecision::Summarize
    );
}

#[test]
fn oversized_message_is_admitted_with_summarize() {
    let ctx = window(30);
    assert_eq!(ctx.admit(&Message::user(text(31)), &[]), AdmissionDecision::Summarize);
}

#[test]
fn admission_always_fits_or_summarizes() {
    let ctx = window(50);
    for size in [1, 9, 17, 26, 40, 49, 50, 51] {
        let mut messages: Vec<Message> = (0..6)
            .map(|i| {
                let mut m = Message::user(text(7 + i));
                m.pinned = i % 3 == 0;
                m
            })
            .collect();
        let incoming = Message::assistant(text(size));
        let decision = ctx.admit(&incoming, &messages);
        if decision == AdmissionDecision::Summarize {
            continue;
        }
        apply(&mut messages, decision);
        messages.push(incoming);
        assert!(
            ctx.stats(&messages).current_tokens <= 50,
            "size {size} overflowed after {decision:?}"
        );
    }
}

#[test]
fn reserved_system_prompt_counts() {
    let mut ctx = window(100);
    ctx.reserve_system_prompt(Some("be brief"));
    assert_eq!(ctx.stats(&[]).breakdown.system, 8);
    ctx.reserve_system_prompt(None);
    assert_eq!(ctx.stats(&[]).current_tokens, 0);
}

#[test]
fn trimmed_count_accumulates_and_resets() {
    let mut ctx = window(100);
    ctx.record_trim(2);
    ctx.record_trim(3);
    assert_eq!(ctx.stats(&[]).trimmed_count, 5);
    ctx.reset();
    assert_eq!(ctx.trimmed_count(), 0);
}

#[test]
fn from_config_uses_char_ratio() {
    let ctx = ContextWindow::from_config(&ContextConfig::default());
    assert_eq!(ctx.config().max_tokens, 8000);
    // 8 chars / 4 per token + 4 overhead
    assert_eq!(ctx.stats(&[Message::user("abcdefgh")]).current_tokens, 6);
}
