use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::cache::QueryKey;
use super::store::{Direction, Row, TableQuery};
use crate::views::form::RequiredFields;

/// Store-assigned row identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tenant identifier; every query is filtered by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanyId(pub String);

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which slice of a table a view is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub company_id: CompanyId,
    pub project_id: Option<RecordId>,
}

impl Scope {
    pub fn company(company_id: impl Into<String>) -> Self {
        Self {
            company_id: CompanyId(company_id.into()),
            project_id: None,
        }
    }

    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(RecordId(project_id.into()));
        self
    }

    /// Prefix shared by every key of `table` for this tenant.
    pub fn table_key(&self, table: &str) -> QueryKey {
        QueryKey::new([table, self.company_id.0.as_str()])
    }

    pub fn key_for<E: Entity>(&self) -> QueryKey {
        let key = self.table_key(E::TABLE);
        match (&self.project_id, E::PROJECT_SCOPED) {
            (Some(project), true) => key.with(project.0.as_str()),
            _ => key,
        }
    }

    pub fn query_for<E: Entity>(&self) -> TableQuery {
        let mut query = TableQuery::table(E::TABLE).eq("company_id", self.company_id.0.as_str());
        if let (Some(project), true) = (&self.project_id, E::PROJECT_SCOPED) {
            query = query.eq("project_id", project.0.as_str());
        }
        let (field, direction) = E::ORDER_BY;
        query.order_by(field, direction)
    }
}

/// A record type bound to one tenant-scoped table.
pub trait Entity: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static {
    const TABLE: &'static str;
    /// Plural noun used in empty-state messages.
    const LABEL: &'static str;
    const ORDER_BY: (&'static str, Direction);
    /// Rows carry a `project_id` column that narrows project views.
    const PROJECT_SCOPED: bool = false;

    fn id(&self) -> &RecordId;

    /// Display fields the list search box matches against.
    fn search_fields(&self) -> Vec<&str>;

    fn status(&self) -> Option<&str> {
        None
    }

    /// Recomputes stored columns that follow from other columns of `row`.
    fn rederive(_row: &mut Row) {}
}

/// Form state collected by a create dialog.
pub trait Draft: Serialize + DeserializeOwned + fmt::Debug + Send + 'static {
    type Record: Entity;

    /// Status written when the form leaves it empty.
    const DEFAULT_STATUS: Option<&'static str> = None;

    fn required(&self) -> RequiredFields;

    /// Adds columns computed from the form values before the insert.
    fn derive(&self, _row: &mut Row) {}
}
