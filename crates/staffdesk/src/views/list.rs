use serde::{Deserialize, Serialize};

use crate::data::client::FetchOutcome;
use crate::data::entity::Entity;

/// Client-side filter box: substring search plus an optional status pick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListFilter {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl ListFilter {
    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search: Some(term.into()),
            status: None,
        }
    }

    pub fn status(status: impl Into<String>) -> Self {
        Self {
            search: None,
            status: Some(status.into()),
        }
    }

    fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(str::to_lowercase)
    }

    fn status_term(&self) -> Option<&str> {
        self.status
            .as_deref()
            .map(str::trim)
            .filter(|status| !status.is_empty() && *status != "all")
    }

    pub fn is_active(&self) -> bool {
        self.search_term().is_some() || self.status_term().is_some()
    }

    pub fn matches<E: Entity>(&self, record: &E) -> bool {
        let search_hit = match self.search_term() {
            Some(term) => record
                .search_fields()
                .into_iter()
                .any(|field| field.to_lowercase().contains(&term)),
            None => true,
        };

        let status_hit = match self.status_term() {
            Some(wanted) => record
                .status()
                .is_some_and(|status| status.eq_ignore_ascii_case(wanted)),
            None => true,
        };

        search_hit && status_hit
    }

    /// Keeps matching records in their fetched order.
    pub fn apply<E: Entity>(&self, records: Vec<E>) -> Vec<E> {
        records
            .into_iter()
            .filter(|record| self.matches(record))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ListState<E> {
    Loading,
    Empty { message: String },
    Loaded { rows: Vec<E> },
}

/// Render model of a query-bound list.
#[derive(Debug, Clone)]
pub struct ListView<E> {
    pub state: ListState<E>,
    /// Rows fetched before filtering.
    pub total: usize,
    /// The fetch failed and an empty collection was substituted.
    pub degraded: bool,
}

impl<E: Entity> ListView<E> {
    pub fn loading() -> Self {
        Self {
            state: ListState::Loading,
            total: 0,
            degraded: false,
        }
    }

    pub fn from_outcome(outcome: FetchOutcome<E>, filter: &ListFilter) -> Self {
        let total = outcome.rows.len();
        let rows = filter.apply(outcome.rows);

        let state = if rows.is_empty() {
            ListState::Empty {
                message: empty_message(E::LABEL, total > 0 && filter.is_active()),
            }
        } else {
            ListState::Loaded { rows }
        };

        Self {
            state,
            total,
            degraded: outcome.degraded,
        }
    }

    pub fn rows(&self) -> &[E] {
        match &self.state {
            ListState::Loaded { rows } => rows,
            ListState::Loading | ListState::Empty { .. } => &[],
        }
    }

    pub fn into_rows(self) -> Vec<E> {
        match self.state {
            ListState::Loaded { rows } => rows,
            ListState::Loading | ListState::Empty { .. } => Vec::new(),
        }
    }

    pub fn message(&self) -> Option<&str> {
        match &self.state {
            ListState::Loading => Some("Loading..."),
            ListState::Empty { message } => Some(message),
            ListState::Loaded { .. } => None,
        }
    }
}

pub fn empty_message(label: &str, filtered: bool) -> String {
    if filtered {
        format!("No {label} match the current filter.")
    } else {
        format!("No {label} found yet.")
    }
}
