use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use serde_json::Value;

use super::store::{Filter, Row, SessionUser, StoreError, TableQuery, TableStore};

/// Process-local table store used by the service, the demo and the tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Vec<Row>>>,
    session: Mutex<Option<SessionUser>>,
    sequence: AtomicU64,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: SessionUser) -> Self {
        let store = Self::default();
        if let Ok(mut guard) = store.session.lock() {
            *guard = Some(session);
        }
        store
    }

    /// Simulates an unreachable store: every call fails with `Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Release);
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.tables()
            .map(|tables| tables.get(table).map_or(0, Vec::len))
            .unwrap_or_default()
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::Acquire) {
            Err(StoreError::Unavailable("memory store offline".to_string()))
        } else {
            Ok(())
        }
    }

    fn tables(&self) -> Result<MutexGuard<'_, HashMap<String, Vec<Row>>>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn next_id(&self, table: &str) -> String {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{id:06}", table.strip_suffix('s').unwrap_or(table))
    }
}

impl TableStore for MemoryStore {
    fn select(&self, query: &TableQuery) -> Result<Vec<Row>, StoreError> {
        self.ensure_online()?;
        let tables = self.tables()?;
        let mut rows: Vec<Row> = tables
            .get(&query.table)
            .map(|rows| rows.iter().filter(|row| query.matches(row)).cloned().collect())
            .unwrap_or_default();
        drop(tables);

        query.sort(&mut rows);
        Ok(rows)
    }

    fn insert(&self, table: &str, mut row: Row) -> Result<Row, StoreError> {
        self.ensure_online()?;

        let id = self.next_id(table);
        row.insert("id".to_string(), Value::String(id));
        if !matches!(row.get("created_at"), Some(Value::String(_))) {
            row.insert(
                "created_at".to_string(),
                Value::String(Utc::now().to_rfc3339()),
            );
        }

        let mut tables = self.tables()?;
        tables
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        Ok(row)
    }

    fn update(&self, table: &str, filters: &[Filter], patch: Row) -> Result<Row, StoreError> {
        self.ensure_online()?;

        let mut tables = self.tables()?;
        let row = tables
            .get_mut(table)
            .and_then(|rows| {
                rows.iter_mut()
                    .find(|row| filters.iter().all(|filter| filter.matches(row)))
            })
            .ok_or_else(|| StoreError::NotFound {
                table: table.to_string(),
            })?;

        for (column, value) in patch {
            row.insert(column, value);
        }
        row.insert(
            "updated_at".to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );
        Ok(row.clone())
    }

    fn current_user(&self) -> Result<Option<SessionUser>, StoreError> {
        self.ensure_online()?;
        self.session
            .lock()
            .map(|guard| guard.clone())
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}
