//! Token estimation for context budgeting.
//!
//! Exact tokenisation is provider specific, so the budget works from an
//! injectable estimate.

use crate::message::Message;

pub trait TokenEstimator: Send + Sync {
    /// Estimated tokens for a piece of text.
    fn estimate_text(&self, text: &str) -> usize;

    /// Fixed cost added to every message for role and framing.
    fn per_message_overhead(&self) -> usize {
        4
    }

    /// Flat cost of an attached image.
    fn image_cost(&self) -> usize {
        85
    }

    /// Estimated tokens for a whole message, including tool payloads.
    fn estimate_message(&self, message: &Message) -> usize {
        let mut total = self.per_message_overhead() + self.estimate_text(&message.content);
        if message.image.is_some() {
            total += self.image_cost();
        }
        if let Some(ref tool) = message.tool {
            total += self.estimate_text(&tool.arguments);
            if let Some(ref raw) = tool.raw_result {
                total += self.estimate_text(raw);
            }
        }
        total
    }
}

/// Estimates one token per `chars_per_token` characters, rounded up.
#[derive(Debug, Clone)]
pub struct CharRatioEstimator {
    chars_per_token: usize,
    overhead: usize,
    image_cost: usize,
}

impl CharRatioEstimator {
    pub fn new(chars_per_token: usize) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
            overhead: 4,
            image_cost: 85,
        }
    }

    pub fn with_overhead(mut self, overhead: usize) -> Self {
        self.overhead = overhead;
        self
    }

    pub fn with_image_cost(mut self, cost: usize) -> Self {
        self.image_cost = cost;
        self
    }
}

impl Default for CharRatioEstimator {
    fn default() -> Self {
        Self::new(4)
    }
}

impl TokenEstimator for CharRatioEstimator {
    fn estimate_text(&self, text: &str) -> usize {
        text.chars().count().div_ceil(self.chars_per_token)
    }

    fn per_message_overhead(&self) -> usize {
        self.overhead
    }

    fn image_cost(&self) -> usize {
        self.image_cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ImageAttachment;

    #[test]
    fn text_estimate_rounds_up() {
        let est = CharRatioEstimator::new(4);
        assert_eq!(est.estimate_text(""), 0);
        assert_eq!(est.estimate_text("abc"), 1);
        assert_eq!(est.estimate_text("abcd"), 1);
        assert_eq!(est.estimate_text("abcde"), 2);
    }

    #[test]
    fn counts_chars_not_bytes() {
        let est = CharRatioEstimator::new(1);
        assert_eq!(est.estimate_text("héllo"), 5);
    }

    #[test]
    fn zero_ratio_is_clamped() {
        let est = CharRatioEstimator::new(0);
        assert_eq!(est.estimate_text("abcd"), 4);
    }

    #[test]
    fn message_estimate_includes_overhead_and_image() {
        let est = CharRatioEstimator::new(4).with_overhead(3).with_image_cost(50);
        let plain = Message::user("abcdefgh");
        assert_eq!(est.estimate_message(&plain), 3 + 2);

        let with_image = plain.with_image(ImageAttachment {
            mime_type: "image/jpeg".into(),
            bytes: vec![1, 2, 3],
        });
        assert_eq!(est.estimate_message(&with_image), 3 + 2 + 50);
    }

    #[test]
    fn message_estimate_includes_tool_payload() {
        let est = CharRatioEstimator::new(1).with_overhead(0);
        let mut msg = Message::tool_call("calculator", "c1", "{}");
        msg.content = String::new();
        assert_eq!(est.estimate_message(&msg), 2);

        if let Some(ref mut tool) = msg.tool {
            tool.raw_result = Some("{\"r\":1}".into());
        }
        assert_eq!(est.estimate_message(&msg), 2 + 7);
    }
}
