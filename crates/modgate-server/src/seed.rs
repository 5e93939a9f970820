//! Default rule set installed when the store starts empty

use modgate_core::{Region, Result, RuleKind};
use modgate_rules::{MemoryRuleStore, RuleDraft};
use tracing::info;

/// Install the default moderation rules; returns how many were created
pub fn seed_rules(store: &MemoryRuleStore) -> Result<usize> {
    let drafts = vec![
        RuleDraft::new("Global Toxicity Detection", RuleKind::Toxicity)
            .with_description("Detect toxic, offensive, and hate speech content")
            .with_threshold(0.7)
            .with_priority(100),
        RuleDraft::new("Hate Speech Keywords", RuleKind::Keyword)
            .with_description("Block known hate speech terms")
            .with_patterns(vec![
                "extremist".to_string(),
                "violent threat".to_string(),
            ])
            .with_priority(95),
        RuleDraft::new("Global PII Detection", RuleKind::Pii)
            .with_description("Detect personally identifiable information")
            .with_priority(90),
        RuleDraft::new("EU GDPR Data Protection", RuleKind::Pii)
            .with_description("Enhanced PII detection for EU GDPR compliance")
            .with_region(Region::Eu)
            .with_priority(85),
        RuleDraft::new("US HIPAA Medical Terms", RuleKind::Medical)
            .with_description("Block medical diagnosis and treatment information for the US region")
            .with_region(Region::Us)
            .with_priority(80),
        RuleDraft::new("Cryptocurrency Scam Detection", RuleKind::Keyword)
            .with_description("Detect common cryptocurrency scam patterns")
            .with_patterns(vec![
                "send bitcoin".to_string(),
                "double your crypto".to_string(),
                "free cryptocurrency".to_string(),
                "crypto giveaway scam".to_string(),
            ])
            .with_priority(75),
        RuleDraft::new("Restricted Financial Advice", RuleKind::Financial)
            .with_description("Block specific investment advice and financial predictions")
            .with_priority(70),
    ];

    let count = drafts.len();
    for draft in drafts {
        let rule = store.create(draft)?;
        info!(rule_id = rule.id, rule = %rule.name, "seeded rule");
    }
    Ok(count)
}
