//! Storage seam for metric aggregates.
//!
//! Production deployments put a document or SQL store behind this trait; the
//! in-memory backend serves development and tests with the same semantics.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use insights_core::{AggregateKey, InsightsError, InsightsResult, MetricAggregate};
use tracing::info;

/// Persistence for aggregates. Every mutation must hold the key exclusively
/// from lookup through write so concurrent writers to one key serialize.
pub trait AggregateBackend: Send + Sync {
    /// Fetch or lazily create the aggregate for `key`, run `mutate` on it and
    /// return the stored result, all as one atomic unit. An aggregate owned
    /// by another business fails with `InvalidInput` and is left untouched.
    fn upsert_with(
        &self,
        key: &AggregateKey,
        business_id: &str,
        now: DateTime<Utc>,
        mutate: &mut dyn FnMut(&mut MetricAggregate),
    ) -> InsightsResult<MetricAggregate>;

    /// Mutate an existing aggregate; `None` when the key is unknown.
    fn update_existing(
        &self,
        key: &AggregateKey,
        mutate: &mut dyn FnMut(&mut MetricAggregate),
    ) -> InsightsResult<Option<MetricAggregate>>;

    fn get(&self, key: &AggregateKey) -> InsightsResult<Option<MetricAggregate>>;

    /// All aggregates of a business updated at or after `since`.
    fn scan_business(
        &self,
        business_id: &str,
        since: DateTime<Utc>,
    ) -> InsightsResult<Vec<MetricAggregate>>;
}

/// Sharded in-memory backend. DashMap's entry guard gives per-key exclusive
/// access while unrelated keys proceed in parallel.
pub struct InMemoryBackend {
    aggregates: DashMap<AggregateKey, MetricAggregate>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        info!("Aggregate backend initialized (in-memory)");
        Self {
            aggregates: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.aggregates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aggregates.is_empty()
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AggregateBackend for InMemoryBackend {
    fn upsert_with(
        &self,
        key: &AggregateKey,
        business_id: &str,
        now: DateTime<Utc>,
        mutate: &mut dyn FnMut(&mut MetricAggregate),
    ) -> InsightsResult<MetricAggregate> {
        let mut entry = self
            .aggregates
            .entry(key.clone())
            .or_insert_with(|| MetricAggregate::new(key.clone(), business_id, now));
        if entry.business_id != business_id {
            return Err(InsightsError::invalid(format!(
                "{} belongs to business '{}', not '{}'",
                key, entry.business_id, business_id
            )));
        }
        mutate(entry.value_mut());
        Ok(entry.value().clone())
    }

    fn update_existing(
        &self,
        key: &AggregateKey,
        mutate: &mut dyn FnMut(&mut MetricAggregate),
    ) -> InsightsResult<Option<MetricAggregate>> {
        Ok(self.aggregates.get_mut(key).map(|mut entry| {
            mutate(entry.value_mut());
            entry.value().clone()
        }))
    }

    fn get(&self, key: &AggregateKey) -> InsightsResult<Option<MetricAggregate>> {
        Ok(self.aggregates.get(key).map(|r| r.value().clone()))
    }

    fn scan_business(
        &self,
        business_id: &str,
        since: DateTime<Utc>,
    ) -> InsightsResult<Vec<MetricAggregate>> {
        let mut found: Vec<MetricAggregate> = self
            .aggregates
            .iter()
            .filter(|r| r.business_id == business_id && r.updated_at >= since)
            .map(|r| r.value().clone())
            .collect();
        found.sort_by(|a, b| a.key().cmp(&b.key()));
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_upsert_creates_once() {
        let backend = InMemoryBackend::new();
        let key = AggregateKey::new("d1", Some("c1".into()));
        let now = Utc::now();

        backend.upsert_with(&key, "b1", now, &mut |_| {}).unwrap();
        let later = now + Duration::hours(1);
        let agg = backend
            .upsert_with(&key, "b1", later, &mut |a| a.updated_at = later)
            .unwrap();

        assert_eq!(backend.len(), 1);
        assert_eq!(agg.created_at, now);
        assert_eq!(agg.updated_at, later);
    }

    #[test]
    fn test_upsert_rejects_foreign_business() {
        let backend = InMemoryBackend::new();
        let key = AggregateKey::new("d1", None);
        let now = Utc::now();
        backend.upsert_with(&key, "b1", now, &mut |_| {}).unwrap();

        let mut called = false;
        let err = backend
            .upsert_with(&key, "b2", now, &mut |_| called = true)
            .unwrap_err();
        assert!(matches!(err, InsightsError::InvalidInput(_)));
        assert!(!called);
        assert_eq!(backend.get(&key).unwrap().unwrap().business_id, "b1");
    }

    #[test]
    fn test_update_existing_ignores_unknown_keys() {
        let backend = InMemoryBackend::new();
        let key = AggregateKey::new("missing", None);
        let result = backend.update_existing(&key, &mut |_| {}).unwrap();
        assert!(result.is_none());
        assert!(backend.is_empty());
    }

    #[test]
    fn test_scan_filters_business_and_window() {
        let backend = InMemoryBackend::new();
        let now = Utc::now();
        let old = now - Duration::days(40);

        backend
            .upsert_with(&AggregateKey::new("d2", None), "b1", now, &mut |_| {})
            .unwrap();
        backend
            .upsert_with(&AggregateKey::new("d1", None), "b1", now, &mut |_| {})
            .unwrap();
        backend
            .upsert_with(&AggregateKey::new("d3", None), "b1", old, &mut |_| {})
            .unwrap();
        backend
            .upsert_with(&AggregateKey::new("d4", None), "b2", now, &mut |_| {})
            .unwrap();

        let found = backend
            .scan_business("b1", now - Duration::days(30))
            .unwrap();
        let ids: Vec<_> = found.iter().map(|a| a.design_id.as_str()).collect();
        assert_eq!(ids, vec!["d1", "d2"]);
    }
}
