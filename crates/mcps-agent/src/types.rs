//! Shared types for the conversation layer

use serde::{Deserialize, Serialize};

/// Token usage accumulated across model requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub requests: usize,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub total_tokens: usize,
}

impl Usage {
    /// Add usage from another instance
    pub fn add(&mut self, other: &Usage) {
        self.requests += other.requests;
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.total_tokens += other.total_tokens;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_add() {
        let mut total = Usage::default();
        total.add(&Usage {
            requests: 1,
            input_tokens: 10,
            output_tokens: 5,
            total_tokens: 15,
        });
        total.add(&Usage {
            requests: 1,
            input_tokens: 20,
            output_tokens: 2,
            total_tokens: 22,
        });
        assert_eq!(total.requests, 2);
        assert_eq!(total.total_tokens, 37);
    }
}
