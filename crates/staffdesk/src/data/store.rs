use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::entity::CompanyId;

/// A single table row as exchanged with the store.
pub type Row = Map<String, Value>;

/// Equality predicate on one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, row: &Row) -> bool {
        row.get(&self.field) == Some(&self.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub field: String,
    pub direction: Direction,
}

/// `select * from TABLE where FIELD = VALUE ... order by FIELD`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableQuery {
    pub table: String,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
}

impl TableQuery {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filters: Vec::new(),
            order: None,
        }
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::eq(field, value));
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order = Some(Order {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.filters.iter().all(|filter| filter.matches(row))
    }

    /// Stable in-place sort following the query's order clause.
    pub fn sort(&self, rows: &mut [Row]) {
        let Some(order) = &self.order else {
            return;
        };

        rows.sort_by(|left, right| {
            let ordering = compare_values(left.get(&order.field), right.get(&order.field));
            match order.direction {
                Direction::Ascending => ordering,
                Direction::Descending => ordering.reverse(),
            }
        });
    }
}

impl fmt::Display for TableQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "select * from {}", self.table)?;
        for (index, filter) in self.filters.iter().enumerate() {
            let keyword = if index == 0 { "where" } else { "and" };
            write!(f, " {keyword} {} = {}", filter.field, filter.value)?;
        }
        if let Some(order) = &self.order {
            let direction = match order.direction {
                Direction::Ascending => "asc",
                Direction::Descending => "desc",
            };
            write!(f, " order by {} {direction}", order.field)?;
        }
        Ok(())
    }
}

/// Orders JSON column values: missing and null first, then booleans, numbers, strings.
pub fn compare_values(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(Value::Array(_)) | Some(Value::Object(_)) => 4,
        }
    }

    match (left, right) {
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            let a = a.as_f64().unwrap_or_default();
            let b = b.as_f64().unwrap_or_default();
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        _ => rank(left).cmp(&rank(right)),
    }
}

/// Signed-in user as reported by the store's auth collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub user_id: String,
    pub email: String,
    pub company_id: CompanyId,
}

/// Remote relational store consumed by the data client.
///
/// Implementations own ids, timestamps and write ordering; concurrent updates
/// to the same row resolve as last write wins.
pub trait TableStore: Send + Sync {
    fn select(&self, query: &TableQuery) -> Result<Vec<Row>, StoreError>;
    fn insert(&self, table: &str, row: Row) -> Result<Row, StoreError>;
    fn update(&self, table: &str, filters: &[Filter], patch: Row) -> Result<Row, StoreError>;
    fn current_user(&self) -> Result<Option<SessionUser>, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("no matching row in {table}")]
    NotFound { table: String },
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store rejected the write: {0}")]
    Rejected(String),
    #[error("row in {table} could not be decoded: {reason}")]
    Malformed { table: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn renders_select_statement() {
        let query = TableQuery::table("expenses")
            .eq("company_id", "acme")
            .eq("status", "approved")
            .order_by("expense_date", Direction::Descending);

        assert_eq!(
            query.to_string(),
            r#"select * from expenses where company_id = "acme" and status = "approved" order by expense_date desc"#
        );
    }

    #[test]
    fn sort_places_nulls_first_and_keeps_ties_stable() {
        let query = TableQuery::table("projects").order_by("budget", Direction::Ascending);
        let mut rows = vec![
            row(json!({"name": "b", "budget": 20})),
            row(json!({"name": "a", "budget": null})),
            row(json!({"name": "c", "budget": 5.5})),
            row(json!({"name": "d", "budget": 20})),
        ];

        query.sort(&mut rows);

        let names: Vec<_> = rows
            .iter()
            .map(|row| row["name"].as_str().unwrap_or_default().to_string())
            .collect();
        assert_eq!(names, vec!["a", "c", "b", "d"]);
    }

    #[test]
    fn filters_require_exact_column_values() {
        let query = TableQuery::table("employees").eq("company_id", "acme");
        assert!(query.matches(&row(json!({"company_id": "acme"}))));
        assert!(!query.matches(&row(json!({"company_id": "globex"}))));
        assert!(!query.matches(&row(json!({"name": "no scope"}))));
    }
}
