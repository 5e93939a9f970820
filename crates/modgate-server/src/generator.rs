//! Mock response generator
//!
//! Stands in for the upstream LLM so the gateway can be exercised end to
//! end. Echo mode folds the user message into the reply, which lets unsafe
//! content flow into the moderation pipeline; template mode returns canned
//! assistant prose.

use rand::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorMode {
    /// Reply incorporates the user message verbatim
    #[default]
    Echo,
    /// Reply is a canned template
    Template,
}

const TEMPLATE_RESPONSES: &[&str] = &[
    "I'd be happy to help you with that. Let me explain the key concepts involved.",
    "That's an interesting question. Here's what I think about it.",
    "Based on my understanding, I can provide some insights on this topic.",
    "Let me break this down for you step by step.",
    "Great question! There are several aspects to consider here.",
];

/// Deterministic-enough stand-in for the response generator
pub struct MockGenerator {
    mode: GeneratorMode,
}

impl MockGenerator {
    pub fn new(mode: GeneratorMode) -> Self {
        Self { mode }
    }

    /// Generate a reply for the given user message
    pub fn respond(&self, message: &str) -> String {
        match self.mode {
            GeneratorMode::Echo => format!("You said: {message}"),
            GeneratorMode::Template => {
                let mut rng = rand::thread_rng();
                TEMPLATE_RESPONSES
                    .choose(&mut rng)
                    .copied()
                    .unwrap_or(TEMPLATE_RESPONSES[0])
                    .to_string()
            }
        }
    }
}
