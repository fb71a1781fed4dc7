use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::cache::{QueryCache, QueryKey};
use super::entity::{Draft, Entity, RecordId, Scope};
use super::store::{Filter, Row, SessionUser, StoreError, TableQuery, TableStore};
use crate::views::form::{Notice, SubmitOutcome};

/// Collection produced by a query-bound read.
#[derive(Debug, Clone)]
pub struct FetchOutcome<E> {
    pub key: QueryKey,
    pub rows: Vec<E>,
    pub from_cache: bool,
    /// The store failed and an empty collection stands in for the rows.
    pub degraded: bool,
}

/// Generic read/write utility shared by every feature module.
///
/// Reads go through the query cache; writes go straight to the store and mark
/// the tenant's keys for the written table stale.
pub struct DataClient<S> {
    store: Arc<S>,
    cache: QueryCache,
}

impl<S> DataClient<S>
where
    S: TableStore + 'static,
{
    pub fn new(store: Arc<S>, cache: QueryCache) -> Self {
        Self { store, cache }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Reads the rows bound to `scope`, serving the cache while it is fresh.
    pub fn fetch_list<E: Entity>(&self, scope: &Scope) -> FetchOutcome<E> {
        let key = scope.key_for::<E>();

        let (rows, from_cache) = match self.cache.lookup(&key) {
            Some(rows) => (rows, true),
            None => {
                let query = scope.query_for::<E>();
                let generation = self.cache.generation(&key);
                match self.store.select(&query) {
                    Ok(rows) => {
                        debug!(%key, %query, rows = rows.len(), "query fetched");
                        (self.cache.store_fetched(key.clone(), rows, generation), false)
                    }
                    Err(err) => {
                        warn!(%key, error = %err, "fetch failed, rendering empty collection");
                        return FetchOutcome {
                            key,
                            rows: Vec::new(),
                            from_cache: false,
                            degraded: true,
                        };
                    }
                }
            }
        };

        let rows = rows
            .iter()
            .filter_map(|row| match decode::<E>(row.clone()) {
                Ok(record) => Some(record),
                Err(err) => {
                    warn!(%key, error = %err, "skipping undecodable row");
                    None
                }
            })
            .collect();

        FetchOutcome {
            key,
            rows,
            from_cache,
            degraded: false,
        }
    }

    /// Submits a create form: validate, write once, invalidate on success.
    pub fn create<D: Draft>(&self, scope: &Scope, draft: D) -> SubmitOutcome<D> {
        let table = <D::Record as Entity>::TABLE;

        let mut missing = draft.required().missing();
        if scope.project_id.is_some() && <D::Record as Entity>::PROJECT_SCOPED {
            // the bound project stands in for an omitted project field
            missing.retain(|field| *field != "project_id");
        }
        if !missing.is_empty() {
            debug!(table, ?missing, "submission blocked by required fields");
            let notice = Notice::missing_fields(&missing);
            return SubmitOutcome::Invalid {
                draft,
                missing,
                notice,
            };
        }

        let row = match draft_row(scope, &draft) {
            Ok(row) => row,
            Err(error) => return failed(draft, error),
        };

        let stored = match self.store.insert(table, row) {
            Ok(stored) => stored,
            Err(error) => {
                warn!(table, error = %error, "insert failed");
                return failed(draft, error);
            }
        };

        self.invalidate_table(scope, table);

        match decode::<D::Record>(stored) {
            Ok(record) => {
                info!(table, id = %record.id(), "record created");
                SubmitOutcome::Created {
                    record,
                    notice: Notice::success(format!("Saved to {}", <D::Record as Entity>::LABEL)),
                }
            }
            Err(error) => failed(draft, error),
        }
    }

    /// Reads one record of the tenant straight from the store.
    ///
    /// Unlike [`fetch_list`](Self::fetch_list) a failing store is an error
    /// here, so callers can tell a missing record from an unreachable one.
    pub fn find<E: Entity>(
        &self,
        scope: &Scope,
        id: &RecordId,
    ) -> Result<Option<E>, StoreError> {
        self.find_row::<E>(scope, id)?.map(decode::<E>).transpose()
    }

    fn find_row<E: Entity>(
        &self,
        scope: &Scope,
        id: &RecordId,
    ) -> Result<Option<Row>, StoreError> {
        let query = TableQuery::table(E::TABLE)
            .eq("id", id.0.as_str())
            .eq("company_id", scope.company_id.0.as_str());
        Ok(self.store.select(&query)?.into_iter().next())
    }

    /// Applies a partial update to one record of the tenant.
    ///
    /// The patch is merged into the stored row and derived columns are
    /// recomputed; a result that no longer decodes is refused before writing.
    pub fn update<E: Entity>(
        &self,
        scope: &Scope,
        id: &RecordId,
        patch: Row,
    ) -> Result<E, StoreError> {
        let mut merged = self
            .find_row::<E>(scope, id)?
            .ok_or_else(|| StoreError::NotFound {
                table: E::TABLE.to_string(),
            })?;
        merged.extend(
            patch
                .into_iter()
                .filter(|(column, _)| column != "id" && column != "company_id"),
        );
        E::rederive(&mut merged);
        decode::<E>(merged.clone()).map_err(|err| StoreError::Rejected(err.to_string()))?;

        merged.remove("id");
        merged.remove("company_id");
        let filters = [
            Filter::eq("id", id.0.as_str()),
            Filter::eq("company_id", scope.company_id.0.as_str()),
        ];
        let stored = self.store.update(E::TABLE, &filters, merged)?;
        self.invalidate_table(scope, E::TABLE);
        info!(table = E::TABLE, %id, "record updated");

        decode(stored)
    }

    pub fn current_user(&self) -> Result<Option<SessionUser>, StoreError> {
        self.store.current_user()
    }

    fn invalidate_table(&self, scope: &Scope, table: &str) {
        let prefix = scope.table_key(table);
        let touched = self.cache.invalidate_prefix(&prefix);
        debug!(key = %prefix, touched, "cache invalidated");
    }
}

fn failed<D: Draft>(draft: D, error: StoreError) -> SubmitOutcome<D> {
    let notice = Notice::error(format!("Could not save: {error}"));
    SubmitOutcome::Failed {
        draft,
        error,
        notice,
    }
}

fn decode<E: Entity>(row: Row) -> Result<E, StoreError> {
    serde_json::from_value(Value::Object(row)).map_err(|err| StoreError::Malformed {
        table: E::TABLE.to_string(),
        reason: err.to_string(),
    })
}

fn draft_row<D: Draft>(scope: &Scope, draft: &D) -> Result<Row, StoreError> {
    let mut row = match serde_json::to_value(draft) {
        Ok(Value::Object(row)) => row,
        Ok(_) => {
            return Err(StoreError::Rejected(
                "form values must serialize to an object".to_string(),
            ))
        }
        Err(err) => return Err(StoreError::Rejected(err.to_string())),
    };

    row.remove("id");
    row.insert(
        "company_id".to_string(),
        Value::String(scope.company_id.0.clone()),
    );

    if let Some(project) = &scope.project_id {
        if <D::Record as Entity>::PROJECT_SCOPED
            && row.get("project_id").map_or(true, Value::is_null)
        {
            row.insert("project_id".to_string(), Value::String(project.0.clone()));
        }
    }

    if let Some(status) = D::DEFAULT_STATUS {
        let blank = match row.get("status") {
            None | Some(Value::Null) => true,
            Some(Value::String(value)) => value.trim().is_empty(),
            Some(_) => false,
        };
        if blank {
            row.insert("status".to_string(), Value::String(status.to_string()));
        }
    }

    draft.derive(&mut row);
    Ok(row)
}
