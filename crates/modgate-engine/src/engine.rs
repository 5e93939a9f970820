//! The moderation engine
//!
//! One `moderate` call per generated reply. Postconditions, all enforced
//! here: exactly one audit submission per invocation, no error or panic
//! crosses to the caller, `final_response == bot_response` unless blocked,
//! and `latency_ns` spans engine entry to just before sink emission.

use crate::config::EngineConfig;
use crate::decision;
use chrono::Utc;
use futures::future::join_all;
use futures::FutureExt;
use modgate_core::{
    AuditRecord, AuditTag, ModerationRequest, ModerationResult, Region, RuleOutcome,
};
use modgate_detectors::DetectorSet;
use modgate_rules::{CompiledRule, RuleCheck, SnapshotCache};
use modgate_telemetry::AuditSink;
use serde_json::json;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Region-aware moderation engine over a shared rule snapshot cache
pub struct ModerationEngine {
    snapshots: Arc<SnapshotCache>,
    detectors: DetectorSet,
    audit: Arc<dyn AuditSink>,
    config: EngineConfig,
}

impl ModerationEngine {
    /// Wire up an engine; all collaborators are constructed at process init
    pub fn new(
        snapshots: Arc<SnapshotCache>,
        detectors: DetectorSet,
        audit: Arc<dyn AuditSink>,
        config: EngineConfig,
    ) -> Self {
        Self {
            snapshots,
            detectors,
            audit,
            config,
        }
    }

    /// Moderate one generated reply
    ///
    /// Never returns an error: detector failures skip their rule, a rule
    /// store failure evaluates against the last good snapshot, and a panic
    /// anywhere below degrades to the failsafe result with an
    /// `intercepted="false"` counter. If the caller drops this future
    /// mid-evaluation, an audit record tagged `cancelled` is still emitted.
    pub async fn moderate(&self, request: ModerationRequest) -> ModerationResult {
        let start = Instant::now();
        let request_id = Uuid::new_v4().to_string();
        let region = request.region;

        let mut cancel_guard = CancelGuard::arm(self.audit.clone(), &request, &request_id, start);

        let evaluated = AssertUnwindSafe(self.evaluate(&request))
            .catch_unwind()
            .await;

        let (result, tag) = match evaluated {
            Ok(outcomes) => {
                let result = self.compose(request_id, &request, outcomes, start);
                metrics::counter!("modgate_interception_total", "intercepted" => "true")
                    .increment(1);
                metrics::counter!(
                    "modgate_requests_total",
                    "region" => region.as_str(),
                    "status" => "success"
                )
                .increment(1);
                self.record_decision_metrics(&result);
                (result, AuditTag::Decision)
            }
            Err(panic) => {
                let result = ModerationResult {
                    request_id,
                    final_response: request.bot_response.clone(),
                    is_flagged: false,
                    is_blocked: false,
                    triggered: Vec::new(),
                    scores: BTreeMap::new(),
                    latency_ns: start.elapsed().as_nanos() as u64,
                    region,
                    session_id: request.session_id.clone(),
                };
                error!(
                    request_id = %result.request_id,
                    panic = %panic_message(&panic),
                    "engine panicked; returning failsafe result"
                );
                metrics::counter!("modgate_interception_total", "intercepted" => "false")
                    .increment(1);
                metrics::counter!(
                    "modgate_requests_total",
                    "region" => region.as_str(),
                    "status" => "error"
                )
                .increment(1);
                (result, AuditTag::EngineError)
            }
        };

        cancel_guard.disarm();
        self.submit_audit(AuditRecord::from_result(&request, &result, tag));
        result
    }

    /// Evaluate every applicable rule against the reply
    ///
    /// Detectors are stateless, so rules run concurrently; `join_all`
    /// preserves input order, which keeps reports in priority order.
    async fn evaluate(&self, request: &ModerationRequest) -> Vec<RuleOutcome> {
        let snapshot = self.snapshots.current().await;
        let rules = snapshot.for_region(request.region);
        debug!(
            region = %request.region,
            rules = rules.len(),
            "evaluating moderation rules"
        );

        join_all(
            rules
                .iter()
                .map(|rule| self.evaluate_rule(rule, &request.bot_response)),
        )
        .await
    }

    async fn evaluate_rule(&self, rule: &CompiledRule, text: &str) -> RuleOutcome {
        let started = Instant::now();

        let evaluated = match &rule.check {
            RuleCheck::Pii => self
                .detectors
                .pii
                .detect(text)
                .await
                .map(|d| (d.triggered, None, d.details)),
            RuleCheck::Financial => self
                .detectors
                .financial
                .detect(text)
                .await
                .map(|d| (d.triggered, None, d.details)),
            RuleCheck::Medical => self
                .detectors
                .medical
                .detect(text)
                .await
                .map(|d| (d.triggered, None, d.details)),
            RuleCheck::Toxicity { threshold } => self.score_toxicity(text, *threshold).await,
            RuleCheck::Keyword { matcher } => {
                let found = matcher.find_matches(text);
                let count = found.len();
                Ok((count > 0, None, json!({ "matched": found, "count": count })))
            }
            RuleCheck::Regex { patterns } => {
                let found = patterns.find_matches(text);
                Ok((!found.is_empty(), None, json!({ "matched_patterns": found })))
            }
        };

        metrics::histogram!("modgate_rule_execution_seconds", "kind" => rule.kind.as_str())
            .record(started.elapsed().as_secs_f64());

        match evaluated {
            Ok((triggered, score, details)) => {
                if triggered {
                    metrics::counter!("modgate_rules_triggered_total", "kind" => rule.kind.as_str())
                        .increment(1);
                }
                RuleOutcome {
                    rule_id: rule.id,
                    rule_name: rule.name.clone(),
                    kind: rule.kind,
                    triggered,
                    should_block: triggered && decision::blocks_on_trigger(rule.kind, &rule.name),
                    score,
                    details,
                }
            }
            Err(e) => {
                warn!(
                    rule_id = rule.id,
                    rule = %rule.name,
                    error = %e,
                    "rule evaluation failed; treating as not triggered"
                );
                metrics::counter!(
                    "modgate_detector_errors_total",
                    "detector" => rule.kind.as_str(),
                    "reason" => "error"
                )
                .increment(1);
                RuleOutcome {
                    rule_id: rule.id,
                    rule_name: rule.name.clone(),
                    kind: rule.kind,
                    triggered: false,
                    should_block: false,
                    score: None,
                    details: json!({ "skipped": true, "error": e.to_string() }),
                }
            }
        }
    }

    async fn score_toxicity(
        &self,
        text: &str,
        threshold: f32,
    ) -> modgate_core::Result<(bool, Option<f32>, serde_json::Value)> {
        let budget = Duration::from_millis(self.config.toxicity_timeout_ms);

        match tokio::time::timeout(budget, self.detectors.toxicity.score(text)).await {
            Ok(Ok(scores)) => {
                let max = scores.max();
                Ok((
                    max >= threshold,
                    Some(max),
                    json!({ "scores": scores, "threshold": threshold }),
                ))
            }
            Ok(Err(e)) => {
                metrics::counter!(
                    "modgate_detector_errors_total",
                    "detector" => "toxicity",
                    "reason" => "model_error"
                )
                .increment(1);
                if self.config.toxicity_fail_open {
                    warn!(error = %e, "toxicity model failed; failing open");
                    Ok((false, None, json!({ "error": e.to_string(), "fail_open": true })))
                } else {
                    warn!(error = %e, "toxicity model failed; failing closed");
                    Ok((true, None, json!({ "error": e.to_string(), "fail_open": false })))
                }
            }
            Err(_) => {
                metrics::counter!(
                    "modgate_detector_errors_total",
                    "detector" => "toxicity",
                    "reason" => "timeout"
                )
                .increment(1);
                warn!(timeout_ms = self.config.toxicity_timeout_ms, "toxicity inference timed out");
                Ok((false, None, json!({ "timed_out": true })))
            }
        }
    }

    fn compose(
        &self,
        request_id: String,
        request: &ModerationRequest,
        outcomes: Vec<RuleOutcome>,
        start: Instant,
    ) -> ModerationResult {
        let verdict = decision::decide(&outcomes);

        let mut scores = BTreeMap::new();
        for outcome in &outcomes {
            if let Some(score) = outcome.score {
                let entry = scores.entry(outcome.kind).or_insert(score);
                *entry = entry.max(score);
            }
        }

        let final_response = match verdict.fallback {
            Some(kind) => decision::fallback_message(kind).to_string(),
            None => request.bot_response.clone(),
        };

        let triggered: Vec<RuleOutcome> =
            outcomes.into_iter().filter(|o| o.triggered).collect();

        ModerationResult {
            request_id,
            final_response,
            is_flagged: verdict.is_flagged,
            is_blocked: verdict.is_blocked,
            triggered,
            scores,
            latency_ns: start.elapsed().as_nanos() as u64,
            region: request.region,
            session_id: request.session_id.clone(),
        }
    }

    fn record_decision_metrics(&self, result: &ModerationResult) {
        metrics::histogram!("modgate_moderation_latency_seconds")
            .record(result.latency_ns as f64 / 1e9);

        if result.latency_ns > self.config.sla_ms * 1_000_000 {
            warn!(
                latency_ms = result.latency_ms(),
                "moderation latency exceeded the SLA ceiling"
            );
            metrics::counter!("modgate_sla_violations_total").increment(1);
        }

        let decision = if result.is_blocked {
            "blocked"
        } else if result.is_flagged {
            "flagged"
        } else {
            "allowed"
        };
        metrics::counter!(
            "modgate_responses_total",
            "decision" => decision,
            "region" => result.region.as_str()
        )
        .increment(1);
    }

    fn submit_audit(&self, record: AuditRecord) {
        metrics::counter!("modgate_audit_attempts_total").increment(1);
        self.audit.submit(record);
    }
}

/// Emits a `cancelled` audit record if the moderate future is dropped
/// before the decision audit goes out
struct CancelGuard {
    audit: Arc<dyn AuditSink>,
    pending: Option<PendingCancel>,
}

struct PendingCancel {
    request_id: String,
    user_message: String,
    bot_response: String,
    region: Region,
    session_id: Option<String>,
    start: Instant,
}

impl CancelGuard {
    fn arm(
        audit: Arc<dyn AuditSink>,
        request: &ModerationRequest,
        request_id: &str,
        start: Instant,
    ) -> Self {
        Self {
            audit,
            pending: Some(PendingCancel {
                request_id: request_id.to_string(),
                user_message: request.user_message.clone(),
                bot_response: request.bot_response.clone(),
                region: request.region,
                session_id: request.session_id.clone(),
                start,
            }),
        }
    }

    fn disarm(&mut self) {
        self.pending = None;
    }
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };

        warn!(
            request_id = %pending.request_id,
            "request abandoned mid-evaluation; emitting cancelled audit record"
        );
        metrics::counter!(
            "modgate_requests_total",
            "region" => pending.region.as_str(),
            "status" => "cancelled"
        )
        .increment(1);
        metrics::counter!("modgate_interception_total", "intercepted" => "true").increment(1);
        metrics::counter!("modgate_audit_attempts_total").increment(1);

        // No partial response is ever delivered.
        self.audit.submit(AuditRecord {
            request_id: pending.request_id,
            timestamp: Utc::now(),
            user_message: pending.user_message,
            bot_response: pending.bot_response,
            final_response: String::new(),
            is_flagged: false,
            is_blocked: false,
            triggered: Vec::new(),
            scores: BTreeMap::new(),
            latency_ns: pending.start.elapsed().as_nanos() as u64,
            region: pending.region,
            session_id: pending.session_id,
            tag: AuditTag::Cancelled,
        });
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
