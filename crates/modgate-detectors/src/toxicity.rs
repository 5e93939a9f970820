//! Toxicity scoring over six labels
//!
//! Lexicon-scored model: each label owns a case-insensitive vocabulary and
//! scores by match count. Deterministic for a given input, bounded memory,
//! safe for concurrent inference. Scores are capped below 1.0 because a
//! lexicon match is never fully confident.

use crate::detector::{ToxicityScorer, ToxicityScores};
use aho_corasick::AhoCorasick;
use modgate_core::{Error, Result};

const TOXICITY_TERMS: &[&str] = &[
    "hate you",
    "shut up",
    "pathetic",
    "worthless",
    "disgusting",
    "garbage human",
    "you suck",
    "nobody likes you",
];

const SEVERE_TOXICITY_TERMS: &[&str] = &[
    "kill yourself",
    "go die",
    "deserve to die",
    "end your life",
];

const OBSCENE_TERMS: &[&str] = &[
    "shit",
    "fuck",
    "bitch",
    "bastard",
    "asshole",
    "piss off",
];

const THREAT_TERMS: &[&str] = &[
    "i will kill",
    "i will hurt",
    "i will find you",
    "watch your back",
    "you will regret",
    "i will destroy you",
];

const INSULT_TERMS: &[&str] = &[
    "idiot",
    "stupid",
    "moron",
    "dumb",
    "imbecile",
    "loser",
    "clown",
    "fool",
];

const IDENTITY_HATE_TERMS: &[&str] = &[
    "your kind",
    "you people",
    "go back to your country",
    "subhuman",
    "don't belong here",
];

/// Base score for a single vocabulary hit; each further hit adds [`HIT_STEP`]
const HIT_BASE: f32 = 0.55;
const HIT_STEP: f32 = 0.25;
const SCORE_CAP: f32 = 0.95;

/// Lexicon-backed toxicity model
pub struct ToxicityModel {
    labels: Vec<(Label, AhoCorasick)>,
}

#[derive(Debug, Clone, Copy)]
enum Label {
    Toxicity,
    SevereToxicity,
    Obscene,
    Threat,
    Insult,
    IdentityHate,
}

impl ToxicityModel {
    /// Create a new model with all label vocabularies compiled
    pub fn new() -> Result<Self> {
        let vocabularies = [
            (Label::Toxicity, TOXICITY_TERMS),
            (Label::SevereToxicity, SEVERE_TOXICITY_TERMS),
            (Label::Obscene, OBSCENE_TERMS),
            (Label::Threat, THREAT_TERMS),
            (Label::Insult, INSULT_TERMS),
            (Label::IdentityHate, IDENTITY_HATE_TERMS),
        ];

        let mut labels = Vec::with_capacity(vocabularies.len());
        for (label, terms) in vocabularies {
            let matcher = AhoCorasick::builder()
                .ascii_case_insensitive(true)
                .build(terms)
                .map_err(|e| {
                    Error::detector(format!("failed to build toxicity matcher: {e}"))
                })?;
            labels.push((label, matcher));
        }

        Ok(Self { labels })
    }

    fn score_label(matcher: &AhoCorasick, text: &str) -> f32 {
        // Count distinct vocabulary terms, not raw occurrences, so repeating
        // one word does not inflate the score.
        let mut seen = [false; 16];
        let mut hits = 0u32;
        for m in matcher.find_iter(text) {
            let idx = m.pattern().as_usize();
            if idx < seen.len() && !seen[idx] {
                seen[idx] = true;
                hits += 1;
            }
        }

        if hits == 0 {
            0.0
        } else {
            (HIT_BASE + HIT_STEP * hits as f32).min(SCORE_CAP)
        }
    }
}

#[async_trait::async_trait]
impl ToxicityScorer for ToxicityModel {
    async fn score(&self, text: &str) -> Result<ToxicityScores> {
        let mut scores = ToxicityScores::default();

        for (label, matcher) in &self.labels {
            let value = Self::score_label(matcher, text);
            match label {
                Label::Toxicity => scores.toxicity = value,
                Label::SevereToxicity => scores.severe_toxicity = value,
                Label::Obscene => scores.obscene = value,
                Label::Threat => scores.threat = value,
                Label::Insult => scores.insult = value,
                Label::IdentityHate => scores.identity_hate = value,
            }
        }

        Ok(scores)
    }

    fn name(&self) -> &str {
        "toxicity"
    }
}
