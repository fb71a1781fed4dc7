use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::ApiState;
use crate::data::{Draft, Entity, RecordId, Row, Scope, StoreError, TableStore};
use crate::views::{ListFilter, ListState, ListView, SubmitOutcome};

/// Query string accepted by every list endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
}

impl ListParams {
    pub(crate) fn scope(&self, company_id: String) -> Scope {
        let scope = Scope::company(company_id);
        match self.project_id.as_deref().map(str::trim) {
            Some(project) if !project.is_empty() => scope.with_project(project),
            _ => scope,
        }
    }

    pub(crate) fn filter(&self) -> ListFilter {
        ListFilter {
            search: self.search.clone(),
            status: self.status.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListResponse<E> {
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub total: usize,
    pub matched: usize,
    pub degraded: bool,
    pub rows: Vec<E>,
}

impl<E: Entity> From<ListView<E>> for ListResponse<E> {
    fn from(view: ListView<E>) -> Self {
        let message = view.message().map(str::to_string);
        let state = match &view.state {
            ListState::Loading => "loading",
            ListState::Empty { .. } => "empty",
            ListState::Loaded { .. } => "loaded",
        };
        let (total, degraded) = (view.total, view.degraded);
        let rows = view.into_rows();

        Self {
            state,
            message,
            total,
            matched: rows.len(),
            degraded,
            rows,
        }
    }
}

pub(crate) async fn list_records<S, E>(
    State(state): State<ApiState<S>>,
    Path(company_id): Path<String>,
    Query(params): Query<ListParams>,
) -> Json<ListResponse<E>>
where
    S: TableStore + 'static,
    E: Entity,
{
    let scope = params.scope(company_id);
    let outcome = state.client.fetch_list::<E>(&scope);
    Json(ListView::from_outcome(outcome, &params.filter()).into())
}

pub(crate) async fn create_record<S, D>(
    State(state): State<ApiState<S>>,
    Path(company_id): Path<String>,
    Query(params): Query<ListParams>,
    Json(draft): Json<D>,
) -> Response
where
    S: TableStore + 'static,
    D: Draft,
{
    let scope = params.scope(company_id);
    match state.client.create(&scope, draft) {
        SubmitOutcome::Created { record, notice } => {
            let payload = json!({
                "record": record,
                "notice": notice,
            });
            (StatusCode::CREATED, Json(payload)).into_response()
        }
        SubmitOutcome::Invalid {
            missing, notice, ..
        } => {
            let payload = json!({
                "error": notice.message,
                "missing_fields": missing,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
        }
        SubmitOutcome::Failed { error, notice, .. } => {
            let payload = json!({
                "error": notice.message,
            });
            (store_status(&error), Json(payload)).into_response()
        }
    }
}

pub(crate) async fn update_record<S, E>(
    State(state): State<ApiState<S>>,
    Path((company_id, id)): Path<(String, String)>,
    Json(patch): Json<Row>,
) -> Response
where
    S: TableStore + 'static,
    E: Entity,
{
    let scope = Scope::company(company_id);
    match state.client.update::<E>(&scope, &RecordId(id), patch) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(error) => {
            let payload = json!({
                "error": error.to_string(),
            });
            (store_status(&error), Json(payload)).into_response()
        }
    }
}

pub(crate) fn store_status(error: &StoreError) -> StatusCode {
    match error {
        StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        StoreError::Rejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
        StoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        StoreError::Malformed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
