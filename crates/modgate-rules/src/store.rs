//! Rule store: the engine-facing read interface and an in-memory
//! implementation carrying the administrative contract

use crate::rule::{RuleDraft, RuleRecord, RuleUpdate};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use modgate_core::{Error, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// The single read operation the moderation core consumes
///
/// One call returns the whole active set; the snapshot cache never issues
/// per-rule fetches on the request path.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Load every active rule, all regions included
    async fn load_active(&self) -> Result<Vec<RuleRecord>>;
}

/// In-memory rule store
///
/// Implements the administrative contract: stable ids, validation on every
/// mutation, and a strictly monotonic `updated_at` per rule.
pub struct MemoryRuleStore {
    rules: RwLock<HashMap<u64, RuleRecord>>,
    next_id: AtomicU64,
}

impl MemoryRuleStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create a rule from a draft, assigning id and timestamps
    pub fn create(&self, draft: RuleDraft) -> Result<RuleRecord> {
        let now = Utc::now();
        let record = RuleRecord {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            name: draft.name,
            description: draft.description,
            kind: draft.kind,
            region: draft.region,
            patterns: draft.patterns,
            threshold: draft.threshold,
            priority: draft.priority,
            is_active: draft.is_active,
            created_at: now,
            updated_at: now,
        };
        record.validate()?;

        self.rules.write().insert(record.id, record.clone());
        Ok(record)
    }

    /// Apply a partial update; bumps `updated_at` strictly monotonically
    pub fn update(&self, id: u64, update: RuleUpdate) -> Result<RuleRecord> {
        let mut rules = self.rules.write();
        let record = rules
            .get_mut(&id)
            .ok_or_else(|| Error::store(format!("no rule with id {id}")))?;

        let mut candidate = record.clone();
        if let Some(name) = update.name {
            candidate.name = name;
        }
        if let Some(description) = update.description {
            candidate.description = description;
        }
        if let Some(region) = update.region {
            candidate.region = region;
        }
        if let Some(patterns) = update.patterns {
            candidate.patterns = patterns;
        }
        if let Some(threshold) = update.threshold {
            candidate.threshold = Some(threshold);
        }
        if let Some(priority) = update.priority {
            candidate.priority = priority;
        }
        if let Some(is_active) = update.is_active {
            candidate.is_active = is_active;
        }
        candidate.validate()?;

        let now = Utc::now();
        candidate.updated_at = if now > record.updated_at {
            now
        } else {
            record.updated_at + ChronoDuration::microseconds(1)
        };

        *record = candidate.clone();
        Ok(candidate)
    }

    /// Remove a rule entirely (a kind change is delete-plus-create)
    pub fn remove(&self, id: u64) -> Result<RuleRecord> {
        self.rules
            .write()
            .remove(&id)
            .ok_or_else(|| Error::store(format!("no rule with id {id}")))
    }

    /// Fetch a single rule
    pub fn get(&self, id: u64) -> Option<RuleRecord> {
        self.rules.read().get(&id).cloned()
    }

    /// All rules, active or not, ordered by id
    pub fn list(&self) -> Vec<RuleRecord> {
        let mut rules: Vec<RuleRecord> = self.rules.read().values().cloned().collect();
        rules.sort_by_key(|r| r.id);
        rules
    }

    /// Whether the store holds no rules at all
    pub fn is_empty(&self) -> bool {
        self.rules.read().is_empty()
    }

    /// Number of rules, active or not
    pub fn len(&self) -> usize {
        self.rules.read().len()
    }
}

impl Default for MemoryRuleStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RuleStore for MemoryRuleStore {
    async fn load_active(&self) -> Result<Vec<RuleRecord>> {
        Ok(self
            .rules
            .read()
            .values()
            .filter(|r| r.is_active)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modgate_core::{Region, RuleKind};

    #[test]
    fn test_create_assigns_stable_ids() {
        let store = MemoryRuleStore::new();
        let a = store.create(RuleDraft::new("first", RuleKind::Pii)).unwrap();
        let b = store.create(RuleDraft::new("second", RuleKind::Pii)).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(store.get(a.id).unwrap().name, "first");
    }

    #[test]
    fn test_create_validates() {
        let store = MemoryRuleStore::new();
        let err = store
            .create(RuleDraft::new("bad", RuleKind::Toxicity).with_threshold(2.0))
            .unwrap_err();
        assert!(err.to_string().contains("threshold"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_update_bumps_updated_at_monotonically() {
        let store = MemoryRuleStore::new();
        let rule = store.create(RuleDraft::new("rule", RuleKind::Pii)).unwrap();

        let first = store
            .update(rule.id, RuleUpdate { priority: Some(5), ..Default::default() })
            .unwrap();
        let second = store
            .update(rule.id, RuleUpdate { priority: Some(6), ..Default::default() })
            .unwrap();

        assert!(first.updated_at > rule.updated_at);
        assert!(second.updated_at > first.updated_at);
    }

    #[test]
    fn test_update_missing_rule() {
        let store = MemoryRuleStore::new();
        assert!(store.update(99, RuleUpdate::default()).is_err());
    }

    #[test]
    fn test_remove() {
        let store = MemoryRuleStore::new();
        let rule = store.create(RuleDraft::new("rule", RuleKind::Pii)).unwrap();
        store.remove(rule.id).unwrap();
        assert!(store.get(rule.id).is_none());
    }

    #[tokio::test]
    async fn test_load_active_filters_inactive() {
        let store = MemoryRuleStore::new();
        let active = store.create(RuleDraft::new("on", RuleKind::Pii)).unwrap();
        let inactive = store.create(RuleDraft::new("off", RuleKind::Pii)).unwrap();
        store
            .update(inactive.id, RuleUpdate { is_active: Some(false), ..Default::default() })
            .unwrap();

        let loaded = store.load_active().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, active.id);
    }

    #[tokio::test]
    async fn test_regional_rules_loaded_in_single_read() {
        let store = MemoryRuleStore::new();
        store
            .create(RuleDraft::new("global", RuleKind::Pii).with_region(Region::Global))
            .unwrap();
        store
            .create(RuleDraft::new("eu only", RuleKind::Pii).with_region(Region::Eu))
            .unwrap();

        // One read returns the whole active set; region filtering happens
        // in the snapshot, not the store.
        assert_eq!(store.load_active().await.unwrap().len(), 2);
    }
}
