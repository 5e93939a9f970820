//! Decision policy and fallback selection
//!
//! Pure functions from rule outcomes to the final verdict. The kind-level
//! blocking policy is a single total match so the closed rule-kind set is
//! enforced by the compiler.

use modgate_core::{RuleKind, RuleOutcome};

/// Fallback category order when multiple blocking kinds fire; privacy and
/// safety fallbacks win over advisory ones.
pub const FALLBACK_PRIORITY: [RuleKind; 6] = [
    RuleKind::Pii,
    RuleKind::Toxicity,
    RuleKind::Financial,
    RuleKind::Medical,
    RuleKind::Regex,
    RuleKind::Keyword,
];

/// Default fallback for blocking kinds without a category-specific message
pub const DEFAULT_FALLBACK_MESSAGE: &str =
    "I apologize, but I cannot provide that response. Please rephrase your question.";

/// Keyword rules are flag-only unless their name carries the hate marker.
///
/// This is the one place the rule-name convention is interpreted; replacing
/// it with an explicit `blocking` rule field only has to change this
/// predicate.
pub fn is_hate_keyword_rule(name: &str) -> bool {
    name.to_ascii_lowercase().contains("hate")
}

/// Whether a trigger on a rule of `kind` named `rule_name` blocks the reply
pub fn blocks_on_trigger(kind: RuleKind, rule_name: &str) -> bool {
    match kind {
        RuleKind::Pii
        | RuleKind::Toxicity
        | RuleKind::Regex
        | RuleKind::Financial
        | RuleKind::Medical => true,
        RuleKind::Keyword => is_hate_keyword_rule(rule_name),
    }
}

/// Aggregated decision over all rule outcomes of one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub is_flagged: bool,
    pub is_blocked: bool,
    /// Fallback category, present iff the reply is blocked
    pub fallback: Option<RuleKind>,
}

/// Compose per-rule outcomes into a single verdict
pub fn decide(outcomes: &[RuleOutcome]) -> Verdict {
    let is_flagged = outcomes.iter().any(|o| o.triggered);
    let is_blocked = outcomes.iter().any(|o| o.triggered && o.should_block);

    let fallback = if is_blocked {
        FALLBACK_PRIORITY.iter().copied().find(|kind| {
            outcomes
                .iter()
                .any(|o| o.triggered && o.should_block && o.kind == *kind)
        })
    } else {
        None
    };

    Verdict {
        is_flagged,
        is_blocked,
        fallback,
    }
}

/// The canned string delivered in place of a blocked reply
pub fn fallback_message(kind: RuleKind) -> &'static str {
    match kind {
        RuleKind::Pii => {
            "I detected potential personal information in the response. For your privacy, I cannot share that."
        }
        RuleKind::Toxicity => {
            "I apologize, but that response doesn't meet our community guidelines."
        }
        RuleKind::Financial => {
            "I cannot provide specific financial advice or information on that topic."
        }
        RuleKind::Medical => {
            "I cannot provide specific medical information. Please consult a healthcare professional."
        }
        RuleKind::Regex | RuleKind::Keyword => DEFAULT_FALLBACK_MESSAGE,
    }
}
