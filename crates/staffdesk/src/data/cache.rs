use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;

use super::store::Row;

/// Ordered segments addressing one cached collection, e.g. `expenses/acme`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn with(mut self, segment: impl Into<String>) -> Self {
        self.0.push(segment.into());
        self
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStatus {
    Fresh,
    Stale,
}

#[derive(Debug)]
struct CacheEntry {
    rows: Arc<Vec<Row>>,
    fetched_at: Instant,
    invalidated: bool,
    fetches: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<QueryKey, CacheEntry>,
    /// Bumped on every invalidation, per invalidated key or prefix.
    generations: HashMap<QueryKey, u64>,
}

impl CacheState {
    fn generation(&self, key: &QueryKey) -> u64 {
        self.generations
            .iter()
            .filter(|(prefix, _)| key.starts_with(prefix))
            .map(|(_, generation)| generation)
            .sum()
    }

    fn bump(&mut self, prefix: &QueryKey) {
        *self.generations.entry(prefix.clone()).or_default() += 1;
    }
}

/// Opaque marker taken before a store read; see [`QueryCache::store_fetched`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation(u64);

/// Keyed store of the last fetched collection per query.
///
/// Entries go stale when invalidated or once older than `stale_after`. The
/// lock is never held across store I/O.
#[derive(Debug)]
pub struct QueryCache {
    state: Mutex<CacheState>,
    stale_after: Duration,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

impl QueryCache {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            stale_after,
        }
    }

    // Entries only mirror the store, so a poisoned map is still safe to reuse.
    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        !entry.invalidated && entry.fetched_at.elapsed() < self.stale_after
    }

    /// Rows for `key` while the entry is fresh.
    pub fn lookup(&self, key: &QueryKey) -> Option<Arc<Vec<Row>>> {
        let state = self.state();
        state
            .entries
            .get(key)
            .filter(|entry| self.is_fresh(entry))
            .map(|entry| Arc::clone(&entry.rows))
    }

    pub fn generation(&self, key: &QueryKey) -> Generation {
        Generation(self.state().generation(key))
    }

    /// Replaces the entry for `key` with a freshly fetched collection.
    pub fn store(&self, key: QueryKey, rows: Vec<Row>) -> Arc<Vec<Row>> {
        let generation = self.generation(&key);
        self.store_fetched(key, rows, generation)
    }

    /// Like [`store`](Self::store) for rows read after `generation` was taken.
    /// When `key` was invalidated in between, the rows may predate the write
    /// and the entry is kept stale.
    pub fn store_fetched(
        &self,
        key: QueryKey,
        rows: Vec<Row>,
        generation: Generation,
    ) -> Arc<Vec<Row>> {
        let rows = Arc::new(rows);
        let mut state = self.state();
        let raced = state.generation(&key) != generation.0;
        let fetches = state.entries.get(&key).map_or(0, |entry| entry.fetches) + 1;
        state.entries.insert(
            key,
            CacheEntry {
                rows: Arc::clone(&rows),
                fetched_at: Instant::now(),
                invalidated: raced,
                fetches,
            },
        );
        rows
    }

    /// Marks exactly `key` stale. Returns whether an entry existed.
    pub fn invalidate(&self, key: &QueryKey) -> bool {
        let mut state = self.state();
        state.bump(key);
        match state.entries.get_mut(key) {
            Some(entry) => {
                entry.invalidated = true;
                true
            }
            None => false,
        }
    }

    /// Marks every key under `prefix` stale and returns how many were touched.
    pub fn invalidate_prefix(&self, prefix: &QueryKey) -> usize {
        let mut state = self.state();
        state.bump(prefix);
        let mut touched = 0;
        for (key, entry) in state.entries.iter_mut() {
            if key.starts_with(prefix) {
                entry.invalidated = true;
                touched += 1;
            }
        }
        touched
    }

    pub fn status(&self, key: &QueryKey) -> Option<CacheStatus> {
        self.state().entries.get(key).map(|entry| {
            if self.is_fresh(entry) {
                CacheStatus::Fresh
            } else {
                CacheStatus::Stale
            }
        })
    }

    /// Number of store reads recorded under `key`.
    pub fn fetch_count(&self, key: &QueryKey) -> u64 {
        self.state().entries.get(key).map_or(0, |entry| entry.fetches)
    }

    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(table: &str, company: &str) -> QueryKey {
        QueryKey::new([table, company])
    }

    #[test]
    fn stored_rows_are_served_until_invalidated() {
        let cache = QueryCache::new(Duration::from_secs(300));
        let expenses = key("expenses", "acme");
        cache.store(expenses.clone(), vec![Row::new()]);

        assert_eq!(cache.lookup(&expenses).map(|rows| rows.len()), Some(1));
        assert_eq!(cache.status(&expenses), Some(CacheStatus::Fresh));

        assert!(cache.invalidate(&expenses));
        assert!(cache.lookup(&expenses).is_none());
        assert_eq!(cache.status(&expenses), Some(CacheStatus::Stale));
    }

    #[test]
    fn zero_stale_time_never_serves_from_cache() {
        let cache = QueryCache::new(Duration::ZERO);
        let employees = key("employees", "acme");
        cache.store(employees.clone(), Vec::new());
        assert!(cache.lookup(&employees).is_none());
    }

    #[test]
    fn prefix_invalidation_only_touches_matching_keys() {
        let cache = QueryCache::new(Duration::from_secs(300));
        let tenant_tasks = key("project_tasks", "acme");
        let project_tasks = tenant_tasks.clone().with("project-000001");
        let other_tenant = key("project_tasks", "globex");
        cache.store(tenant_tasks.clone(), Vec::new());
        cache.store(project_tasks.clone(), Vec::new());
        cache.store(other_tenant.clone(), Vec::new());

        assert_eq!(cache.invalidate_prefix(&tenant_tasks), 2);
        assert!(cache.lookup(&project_tasks).is_none());
        assert!(cache.lookup(&other_tenant).is_some());
    }

    #[test]
    fn refetch_counts_accumulate_per_key() {
        let cache = QueryCache::default();
        let cards = key("company_cards", "acme");
        cache.store(cards.clone(), Vec::new());
        cache.invalidate(&cards);
        cache.store(cards.clone(), Vec::new());
        assert_eq!(cache.fetch_count(&cards), 2);
        assert_eq!(cache.len(), 1);
        assert!(!cache.invalidate(&key("roles", "acme")));
    }

    #[test]
    fn invalidation_during_a_fetch_keeps_the_entry_stale() {
        let cache = QueryCache::new(Duration::from_secs(300));
        let expenses = key("expenses", "acme");
        let before_read = cache.generation(&expenses);

        // a write lands while the read is in flight
        cache.invalidate_prefix(&key("expenses", "acme"));
        cache.store_fetched(expenses.clone(), vec![Row::new()], before_read);

        assert_eq!(cache.status(&expenses), Some(CacheStatus::Stale));
        assert!(cache.lookup(&expenses).is_none());
        assert_eq!(cache.fetch_count(&expenses), 1);

        let settled = cache.generation(&expenses);
        cache.store_fetched(expenses.clone(), Vec::new(), settled);
        assert_eq!(cache.status(&expenses), Some(CacheStatus::Fresh));
    }
}
