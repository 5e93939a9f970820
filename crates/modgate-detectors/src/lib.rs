//! Modgate Detectors
//!
//! Stateless analyzers backing moderation rules:
//! - PII recognizers (email, phone, SSN, credit card, IPv4)
//! - Lexicon-scored toxicity model over six labels
//! - Keyword and regex matchers built per rule version
//! - Built-in financial and medical vocabularies
//!
//! All detectors are deterministic, own no mutable state after
//! construction, and are safe to invoke from concurrent request contexts.

pub mod detector;
pub mod financial;
pub mod keyword;
pub mod medical;
pub mod pattern;
pub mod pii;
pub mod toxicity;

pub use detector::{Detection, Detector, DetectorSet, ToxicityScorer, ToxicityScores};
pub use financial::FinancialTermDetector;
pub use keyword::KeywordMatcher;
pub use medical::MedicalTermDetector;
pub use pattern::PatternSet;
pub use pii::PiiDetector;
pub use toxicity::ToxicityModel;
