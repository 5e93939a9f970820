//! Copy-on-write rule snapshots and the refresh cache
//!
//! The engine reads rules through an immutable `Arc<RuleSnapshot>` that is
//! pointer-swapped on refresh. Readers never hold a lock across rule
//! evaluation, and a stale snapshot triggers at most one concurrent reload;
//! every other request keeps serving the previous snapshot.

use crate::rule::{CompiledRule, RuleRecord};
use crate::store::RuleStore;
use modgate_core::{Region, Result};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Default freshness bound for the active rule set
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Immutable view of the active rule set
///
/// Rules are ordered priority-descending, ties broken by id ascending, so
/// evaluation reports are stable across runs.
pub struct RuleSnapshot {
    rules: Vec<CompiledRule>,
}

impl RuleSnapshot {
    /// The empty snapshot (used before the first load and on total failure)
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Decode and order a set of records
    ///
    /// Records that fail to decode (invalid regex, bad threshold) are
    /// skipped with an error metric; they never fail a request.
    pub fn from_records(records: &[RuleRecord]) -> Self {
        let mut rules = Vec::with_capacity(records.len());
        for record in records.iter().filter(|r| r.is_active) {
            match CompiledRule::compile(record) {
                Ok(rule) => rules.push(rule),
                Err(e) => {
                    warn!(rule_id = record.id, rule = %record.name, error = %e, "skipping rule that failed to decode");
                    metrics::counter!(
                        "modgate_detector_errors_total",
                        "detector" => record.kind.as_str(),
                        "reason" => "compile"
                    )
                    .increment(1);
                }
            }
        }

        rules.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id)));
        Self { rules }
    }

    /// Active rules applying to `region`, in evaluation order
    pub fn for_region(&self, region: Region) -> Vec<&CompiledRule> {
        self.rules
            .iter()
            .filter(|r| r.region.applies_to(region))
            .collect()
    }

    /// All rules in evaluation order
    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

struct CacheState {
    snapshot: Arc<RuleSnapshot>,
    refreshed_at: Option<Instant>,
}

/// Process-local cache over a [`RuleStore`]
///
/// Freshness is interval-based: after any store mutation, every request
/// arriving one refresh interval later observes the new rule set. On store
/// read failure the last good snapshot keeps serving.
pub struct SnapshotCache {
    store: Arc<dyn RuleStore>,
    refresh_interval: Duration,
    state: RwLock<CacheState>,
    refreshing: tokio::sync::Mutex<()>,
}

impl SnapshotCache {
    /// Create a cache over `store` with the given freshness bound
    pub fn new(store: Arc<dyn RuleStore>, refresh_interval: Duration) -> Self {
        Self {
            store,
            refresh_interval,
            state: RwLock::new(CacheState {
                snapshot: Arc::new(RuleSnapshot::empty()),
                refreshed_at: None,
            }),
            refreshing: tokio::sync::Mutex::new(()),
        }
    }

    /// The current snapshot, reloading if the freshness bound has lapsed
    ///
    /// Never blocks behind another reload: if one is already in flight the
    /// previous snapshot is returned as-is.
    pub async fn current(&self) -> Arc<RuleSnapshot> {
        if let Some(snapshot) = self.fresh() {
            return snapshot;
        }

        match self.refreshing.try_lock() {
            Ok(_guard) => self.reload().await,
            Err(_) => self.state.read().snapshot.clone(),
        }
    }

    /// Force a reload, propagating store errors (startup and tests)
    pub async fn refresh_now(&self) -> Result<Arc<RuleSnapshot>> {
        let _guard = self.refreshing.lock().await;
        let records = self.store.load_active().await?;
        Ok(self.install(&records))
    }

    fn fresh(&self) -> Option<Arc<RuleSnapshot>> {
        let state = self.state.read();
        match state.refreshed_at {
            Some(at) if at.elapsed() < self.refresh_interval => Some(state.snapshot.clone()),
            _ => None,
        }
    }

    async fn reload(&self) -> Arc<RuleSnapshot> {
        match self.store.load_active().await {
            Ok(records) => self.install(&records),
            Err(e) => {
                error!(error = %e, "rule store read failed; serving last good snapshot");
                metrics::counter!("modgate_rule_store_errors_total").increment(1);
                self.state.read().snapshot.clone()
            }
        }
    }

    fn install(&self, records: &[RuleRecord]) -> Arc<RuleSnapshot> {
        let snapshot = Arc::new(RuleSnapshot::from_records(records));
        metrics::gauge!("modgate_active_rules").set(snapshot.len() as f64);
        debug!(rules = snapshot.len(), "installed rule snapshot");

        let mut state = self.state.write();
        state.snapshot = snapshot.clone();
        state.refreshed_at = Some(Instant::now());
        snapshot
    }
}
