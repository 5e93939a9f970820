//! End-to-end scenarios for the moderation engine
//!
//! Exercises the full pipeline: snapshot cache, detectors, decision
//! policy, fallbacks, audit emission, and the failsafe paths.

use async_trait::async_trait;
use modgate_core::{
    AuditTag, Error, ModerationRequest, Region, Result, RuleKind,
};
use modgate_detectors::{Detection, Detector, DetectorSet, ToxicityScorer, ToxicityScores};
use modgate_engine::{fallback_message, EngineConfig, ModerationEngine};
use modgate_rules::{MemoryRuleStore, RuleDraft, RuleStore, RuleUpdate, SnapshotCache};
use modgate_telemetry::{AuditSink, MemoryAuditSink};
use std::sync::Arc;
use std::time::Duration;

const REFRESH: Duration = Duration::from_millis(25);

struct Harness {
    engine: ModerationEngine,
    store: Arc<MemoryRuleStore>,
    sink: Arc<MemoryAuditSink>,
}

async fn harness(drafts: Vec<RuleDraft>) -> Harness {
    harness_with(drafts, DetectorSet::standard().unwrap(), EngineConfig::default()).await
}

async fn harness_with(
    drafts: Vec<RuleDraft>,
    detectors: DetectorSet,
    config: EngineConfig,
) -> Harness {
    let store = Arc::new(MemoryRuleStore::new());
    for draft in drafts {
        store.create(draft).unwrap();
    }
    let cache = Arc::new(SnapshotCache::new(
        store.clone() as Arc<dyn RuleStore>,
        REFRESH,
    ));
    cache.refresh_now().await.unwrap();

    let sink = Arc::new(MemoryAuditSink::new());
    let engine = ModerationEngine::new(cache, detectors, sink.clone() as Arc<dyn AuditSink>, config);

    Harness { engine, store, sink }
}

fn pii_rule() -> RuleDraft {
    RuleDraft::new("Global PII Detection", RuleKind::Pii).with_priority(90)
}

fn toxicity_rule() -> RuleDraft {
    RuleDraft::new("Global Toxicity Detection", RuleKind::Toxicity)
        .with_threshold(0.7)
        .with_priority(100)
}

fn crypto_keyword_rule() -> RuleDraft {
    RuleDraft::new("Crypto Scam Detection", RuleKind::Keyword)
        .with_patterns(vec![
            "double your money".to_string(),
            "send bitcoin".to_string(),
        ])
        .with_priority(75)
}

fn hate_keyword_rule() -> RuleDraft {
    RuleDraft::new("Hate Speech Keywords", RuleKind::Keyword)
        .with_patterns(vec!["extremist".to_string(), "violent threat".to_string()])
        .with_priority(95)
}

fn request(bot_response: &str) -> ModerationRequest {
    ModerationRequest::new("user prompt", bot_response)
}

#[tokio::test]
async fn test_pii_reply_blocked_with_pii_fallback() {
    let h = harness(vec![pii_rule(), toxicity_rule()]).await;

    let result = h
        .engine
        .moderate(request("Contact me at alice@example.com").with_region(Region::Us))
        .await;

    assert!(result.is_blocked);
    assert!(result.is_flagged);
    assert_eq!(result.final_response, fallback_message(RuleKind::Pii));
    assert_eq!(result.region, Region::Us);

    let pii = result
        .triggered
        .iter()
        .find(|o| o.kind == RuleKind::Pii)
        .expect("pii outcome");
    assert!(pii.details["by_type"]["email"].as_u64().unwrap() >= 1);
    assert!(pii.should_block);
}

#[tokio::test]
async fn test_clean_reply_allowed_unchanged() {
    let h = harness(vec![pii_rule(), toxicity_rule()]).await;
    let reply = "Hello, how can I help you today?";

    let result = h.engine.moderate(request(reply)).await;

    assert!(!result.is_blocked);
    assert!(!result.is_flagged);
    assert_eq!(result.final_response, reply);
    assert!(result.triggered.is_empty());

    let records = h.sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].tag, AuditTag::Decision);
}

#[tokio::test]
async fn test_toxic_reply_blocked_with_toxicity_fallback() {
    let h = harness(vec![toxicity_rule()]).await;

    let result = h.engine.moderate(request("You are an idiot")).await;

    assert!(result.is_blocked);
    assert!(result.is_flagged);
    assert_eq!(result.final_response, fallback_message(RuleKind::Toxicity));

    let toxicity = &result.triggered[0];
    assert_eq!(toxicity.kind, RuleKind::Toxicity);
    assert!(toxicity.score.unwrap() >= 0.7);
    assert!(*result.scores.get(&RuleKind::Toxicity).unwrap() >= 0.7);
}

#[tokio::test]
async fn test_new_rule_visible_after_refresh_interval() {
    let h = harness(vec![]).await;
    let reply = "that extremist rhetoric is dangerous";

    // Before the rule exists it cannot fire.
    let before = h.engine.moderate(request(reply)).await;
    assert!(!before.is_flagged);

    h.store.create(hate_keyword_rule()).unwrap();
    tokio::time::sleep(REFRESH * 2).await;

    let after = h.engine.moderate(request(reply)).await;
    assert!(after.is_flagged);
    assert!(after
        .triggered
        .iter()
        .any(|o| o.rule_name == "Hate Speech Keywords"));
}

#[tokio::test]
async fn test_keyword_rule_flags_without_blocking() {
    let h = harness(vec![crypto_keyword_rule()]).await;
    let reply = "Send 1 BTC to 1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa and double your money";

    let result = h.engine.moderate(request(reply)).await;

    assert!(result.is_flagged);
    assert!(!result.is_blocked);
    assert_eq!(result.final_response, reply);
    assert!(!result.triggered[0].should_block);
}

#[tokio::test]
async fn test_hate_marked_keyword_rule_blocks() {
    let h = harness(vec![hate_keyword_rule()]).await;

    let result = h
        .engine
        .moderate(request("joining an extremist group"))
        .await;

    assert!(result.is_blocked);
    assert!(result.triggered[0].should_block);
}

#[tokio::test]
async fn test_multi_kind_hit_uses_pii_fallback() {
    let h = harness(vec![pii_rule(), toxicity_rule()]).await;

    let result = h
        .engine
        .moderate(request("You idiot, email me at bob@corp.io"))
        .await;

    assert!(result.is_blocked);
    assert_eq!(result.triggered.len(), 2);
    assert_eq!(result.final_response, fallback_message(RuleKind::Pii));
}

#[tokio::test]
async fn test_triggered_list_in_priority_order() {
    let h = harness(vec![pii_rule(), toxicity_rule(), hate_keyword_rule()]).await;

    let result = h
        .engine
        .moderate(request("You idiot, the extremist wrote to bob@corp.io"))
        .await;

    let kinds: Vec<RuleKind> = result.triggered.iter().map(|o| o.kind).collect();
    assert_eq!(
        kinds,
        vec![RuleKind::Toxicity, RuleKind::Keyword, RuleKind::Pii]
    );
}

#[tokio::test]
async fn test_empty_reply_never_blocked() {
    let h = harness(vec![pii_rule(), toxicity_rule(), crypto_keyword_rule()]).await;

    let result = h.engine.moderate(request("")).await;

    assert!(!result.is_flagged);
    assert!(!result.is_blocked);
    assert_eq!(result.final_response, "");
}

#[tokio::test]
async fn test_invalid_regex_rule_skipped_others_still_evaluated() {
    let h = harness(vec![
        pii_rule(),
        RuleDraft::new("Broken Regex", RuleKind::Regex)
            .with_patterns(vec!["([unclosed".to_string()])
            .with_priority(99),
    ])
    .await;

    let result = h
        .engine
        .moderate(request("mail alice@example.com"))
        .await;

    assert!(result.is_blocked);
    assert_eq!(result.triggered.len(), 1);
    assert_eq!(result.triggered[0].kind, RuleKind::Pii);
}

#[tokio::test]
async fn test_regional_rule_isolated_from_other_regions() {
    let h = harness(vec![
        RuleDraft::new("US HIPAA Medical Terms", RuleKind::Medical)
            .with_region(Region::Us)
            .with_priority(80),
    ])
    .await;
    let reply = "the diagnosis is in your medical record";

    let other = h
        .engine
        .moderate(request(reply).with_region(Region::Eu))
        .await;
    assert!(!other.is_flagged);

    let matching = h
        .engine
        .moderate(request(reply).with_region(Region::Us))
        .await;
    assert!(matching.is_blocked);
    assert_eq!(matching.final_response, fallback_message(RuleKind::Medical));
}

#[tokio::test]
async fn test_same_input_same_snapshot_is_idempotent() {
    let h = harness(vec![pii_rule(), toxicity_rule(), crypto_keyword_rule()]).await;
    let req = request("You idiot, send bitcoin to bob@corp.io");

    let a = h.engine.moderate(req.clone()).await;
    let b = h.engine.moderate(req).await;

    assert_eq!(a.final_response, b.final_response);
    assert_eq!(a.is_flagged, b.is_flagged);
    assert_eq!(a.is_blocked, b.is_blocked);
    let ids = |r: &modgate_core::ModerationResult| {
        r.triggered.iter().map(|o| o.rule_id).collect::<Vec<_>>()
    };
    assert_eq!(ids(&a), ids(&b));
    assert_eq!(a.scores, b.scores);
}

#[tokio::test]
async fn test_toggling_rule_off_and_on_restores_outcome() {
    let h = harness(vec![crypto_keyword_rule()]).await;
    let reply = "send bitcoin now";
    let rule_id = h.store.list()[0].id;

    let initial = h.engine.moderate(request(reply)).await;
    assert!(initial.is_flagged);

    h.store
        .update(rule_id, RuleUpdate { is_active: Some(false), ..Default::default() })
        .unwrap();
    tokio::time::sleep(REFRESH * 2).await;
    let disabled = h.engine.moderate(request(reply)).await;
    assert!(!disabled.is_flagged);

    h.store
        .update(rule_id, RuleUpdate { is_active: Some(true), ..Default::default() })
        .unwrap();
    tokio::time::sleep(REFRESH * 2).await;
    let restored = h.engine.moderate(request(reply)).await;

    assert_eq!(restored.is_flagged, initial.is_flagged);
    assert_eq!(restored.is_blocked, initial.is_blocked);
    assert_eq!(restored.triggered[0].rule_id, initial.triggered[0].rule_id);
}

#[tokio::test]
async fn test_one_audit_record_per_invocation() {
    let h = harness(vec![pii_rule(), toxicity_rule()]).await;

    for reply in ["clean reply", "alice@example.com", "you idiot", ""] {
        h.engine.moderate(request(reply)).await;
    }

    assert_eq!(h.sink.len(), 4);
    assert!(h.sink.records().iter().all(|r| r.tag == AuditTag::Decision));
}

#[tokio::test]
async fn test_audit_record_carries_original_and_final_text() {
    let h = harness(vec![pii_rule()]).await;

    h.engine
        .moderate(ModerationRequest::new("who are you", "mail alice@example.com").with_session_id("sess-7"))
        .await;

    let record = &h.sink.records()[0];
    assert_eq!(record.user_message, "who are you");
    assert_eq!(record.bot_response, "mail alice@example.com");
    assert_eq!(record.final_response, fallback_message(RuleKind::Pii));
    assert_eq!(record.session_id.as_deref(), Some("sess-7"));
    assert!(record.is_blocked);
}

// -- failure injection ------------------------------------------------------

struct PanickingDetector;

#[async_trait]
impl Detector for PanickingDetector {
    async fn detect(&self, _text: &str) -> Result<Detection> {
        panic!("injected detector failure")
    }

    fn name(&self) -> &str {
        "panicking"
    }
}

struct SlowDetector;

#[async_trait]
impl Detector for SlowDetector {
    async fn detect(&self, _text: &str) -> Result<Detection> {
        tokio::time::sleep(Duration::from_millis(500)).await;
        Ok(Detection::clear(0))
    }

    fn name(&self) -> &str {
        "slow"
    }
}

struct FailingScorer;

#[async_trait]
impl ToxicityScorer for FailingScorer {
    async fn score(&self, _text: &str) -> Result<ToxicityScores> {
        Err(Error::detector("model unavailable"))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

struct SlowScorer;

#[async_trait]
impl ToxicityScorer for SlowScorer {
    async fn score(&self, _text: &str) -> Result<ToxicityScores> {
        tokio::time::sleep(Duration::from_millis(200)).await;
        Ok(ToxicityScores::default())
    }

    fn name(&self) -> &str {
        "slow"
    }
}

#[tokio::test]
async fn test_injected_panic_returns_failsafe_result() {
    let handle = modgate_telemetry::metrics::install_recorder().unwrap();

    let mut detectors = DetectorSet::standard().unwrap();
    detectors.pii = Arc::new(PanickingDetector);
    let h = harness_with(vec![pii_rule()], detectors, EngineConfig::default()).await;
    let reply = "anything at all";

    let result = h.engine.moderate(request(reply)).await;

    assert!(!result.is_blocked);
    assert!(!result.is_flagged);
    assert_eq!(result.final_response, reply);

    let records = h.sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].tag, AuditTag::EngineError);

    let rendered = handle.render();
    assert!(
        rendered.contains("modgate_interception_total{intercepted=\"false\"} 1"),
        "missing failsafe interception counter in:\n{rendered}"
    );
}

#[tokio::test]
async fn test_abandoned_request_emits_cancelled_audit() {
    let mut detectors = DetectorSet::standard().unwrap();
    detectors.pii = Arc::new(SlowDetector);
    let h = harness_with(vec![pii_rule()], detectors, EngineConfig::default()).await;

    let abandoned =
        tokio::time::timeout(Duration::from_millis(50), h.engine.moderate(request("hello"))).await;
    assert!(abandoned.is_err(), "moderation should outlive the caller");

    let records = h.sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].tag, AuditTag::Cancelled);
    assert_eq!(records[0].final_response, "");
}

#[tokio::test]
async fn test_toxicity_model_error_fails_open_by_default() {
    let mut detectors = DetectorSet::standard().unwrap();
    detectors.toxicity = Arc::new(FailingScorer);
    let h = harness_with(vec![toxicity_rule()], detectors, EngineConfig::default()).await;

    let result = h.engine.moderate(request("You are an idiot")).await;

    assert!(!result.is_flagged);
    assert!(!result.is_blocked);
}

#[tokio::test]
async fn test_toxicity_model_error_fails_closed_when_configured() {
    let mut detectors = DetectorSet::standard().unwrap();
    detectors.toxicity = Arc::new(FailingScorer);
    let config = EngineConfig {
        toxicity_fail_open: false,
        ..Default::default()
    };
    let h = harness_with(vec![toxicity_rule()], detectors, config).await;

    let result = h.engine.moderate(request("any reply")).await;

    assert!(result.is_blocked);
    assert_eq!(result.final_response, fallback_message(RuleKind::Toxicity));
}

#[tokio::test]
async fn test_toxicity_timeout_never_triggers() {
    let mut detectors = DetectorSet::standard().unwrap();
    detectors.toxicity = Arc::new(SlowScorer);
    let config = EngineConfig {
        toxicity_timeout_ms: 10,
        toxicity_fail_open: false,
        ..Default::default()
    };
    let h = harness_with(vec![toxicity_rule()], detectors, config).await;

    let result = h.engine.moderate(request("any reply")).await;

    assert!(!result.is_flagged);
    assert!(!result.is_blocked);
}
