use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::records::{store_status, ListParams};
use super::ApiState;
use crate::data::{RecordId, Scope, TableStore};
use crate::features::ai_governance::{AiModel, GovernanceOverview};
use crate::features::calendar::{self, CalendarEvent};
use crate::features::cards::{CardPortfolio, CompanyCard};
use crate::features::employees::Employee;
use crate::features::expenses::{Expense, ExpenseSummary};
use crate::features::organization::{OrgTree, OrganizationalUnit, Role};
use crate::features::projects::{
    BudgetOverview, Milestone, Project, ProjectHealth, ProjectRisk, ProjectTask,
};
use crate::features::shifts::{
    self, Absence, Shift, SwapDecision, SwapDecisionError, WorkloadOverview,
};

pub(crate) async fn expense_summary<S>(
    State(state): State<ApiState<S>>,
    Path(company_id): Path<String>,
    Query(params): Query<ListParams>,
) -> Json<serde_json::Value>
where
    S: TableStore + 'static,
{
    let outcome = state
        .client
        .fetch_list::<Expense>(&Scope::company(company_id));
    let degraded = outcome.degraded;
    let mut expenses = params.filter().apply(outcome.rows);
    if let Some(project) = params.project_id.as_deref().filter(|id| !id.is_empty()) {
        expenses.retain(|expense| {
            expense.project_id.as_ref().map(|id| id.0.as_str()) == Some(project)
        });
    }

    Json(json!({
        "summary": ExpenseSummary::from_expenses(&expenses),
        "degraded": degraded,
    }))
}

pub(crate) async fn card_usage<S>(
    State(state): State<ApiState<S>>,
    Path(company_id): Path<String>,
) -> Json<serde_json::Value>
where
    S: TableStore + 'static,
{
    let outcome = state
        .client
        .fetch_list::<CompanyCard>(&Scope::company(company_id));

    Json(json!({
        "portfolio": CardPortfolio::from_cards(&outcome.rows),
        "degraded": outcome.degraded,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct BudgetParams {
    #[serde(default)]
    today: Option<NaiveDate>,
}

pub(crate) async fn project_budget<S>(
    State(state): State<ApiState<S>>,
    Path((company_id, id)): Path<(String, String)>,
    Query(params): Query<BudgetParams>,
) -> Response
where
    S: TableStore + 'static,
{
    let client = &state.client;
    let scope = Scope::company(company_id);
    let id = RecordId(id);

    let project = match client.find::<Project>(&scope, &id) {
        Ok(Some(project)) => project,
        Ok(None) => {
            let payload = json!({
                "error": format!("project {id} does not exist"),
            });
            return (StatusCode::NOT_FOUND, Json(payload)).into_response();
        }
        Err(error) => {
            let payload = json!({ "error": error.to_string() });
            return (store_status(&error), Json(payload)).into_response();
        }
    };

    let expenses = client.fetch_list::<Expense>(&scope);
    let project_scope = scope.clone().with_project(id.0.as_str());
    let tasks = client.fetch_list::<ProjectTask>(&project_scope);
    let milestones = client.fetch_list::<Milestone>(&project_scope);
    let risks = client.fetch_list::<ProjectRisk>(&project_scope);
    let degraded = expenses.degraded || tasks.degraded || milestones.degraded || risks.degraded;
    let today = params.today.unwrap_or_else(|| Utc::now().date_naive());

    let payload = json!({
        "budget": BudgetOverview::compute(&project, &expenses.rows),
        "health": ProjectHealth::compute(
            &project,
            &tasks.rows,
            &milestones.rows,
            &risks.rows,
            today,
        ),
        "degraded": degraded,
    });
    (StatusCode::OK, Json(payload)).into_response()
}

/// A derived figure plus whether any of its inputs failed to load.
#[derive(Debug, Serialize)]
pub(crate) struct Figures<T> {
    #[serde(flatten)]
    figures: T,
    degraded: bool,
}

impl<T> Figures<T> {
    fn new(figures: T, degraded: bool) -> Json<Self> {
        Json(Self { figures, degraded })
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WorkloadParams {
    #[serde(default)]
    week_start: Option<NaiveDate>,
}

pub(crate) async fn workload<S>(
    State(state): State<ApiState<S>>,
    Path(company_id): Path<String>,
    Query(params): Query<WorkloadParams>,
) -> Json<Figures<WorkloadOverview>>
where
    S: TableStore + 'static,
{
    let scope = Scope::company(company_id);
    let week_start = params.week_start.unwrap_or_else(|| {
        let today = Utc::now().date_naive();
        today - Duration::days(i64::from(today.weekday().num_days_from_monday()))
    });

    let employees = state.client.fetch_list::<Employee>(&scope);
    let shifts = state.client.fetch_list::<Shift>(&scope);

    Figures::new(
        WorkloadOverview::compute(
            week_start,
            &employees.rows,
            &shifts.rows,
            state.weekly_capacity_hours,
        ),
        employees.degraded || shifts.degraded,
    )
}

pub(crate) async fn absence_conflicts<S>(
    State(state): State<ApiState<S>>,
    Path(company_id): Path<String>,
) -> Json<serde_json::Value>
where
    S: TableStore + 'static,
{
    let scope = Scope::company(company_id);
    let shifts = state.client.fetch_list::<Shift>(&scope);
    let absences = state.client.fetch_list::<Absence>(&scope);

    Json(json!({
        "conflicts": shifts::absence_conflicts(&shifts.rows, &absences.rows),
        "degraded": shifts.degraded || absences.degraded,
    }))
}

#[derive(Debug, Deserialize)]
pub(crate) struct DecisionRequest {
    decision: SwapDecision,
}

pub(crate) async fn decide_swap<S>(
    State(state): State<ApiState<S>>,
    Path((company_id, id)): Path<(String, String)>,
    Json(request): Json<DecisionRequest>,
) -> Response
where
    S: TableStore + 'static,
{
    let scope = Scope::company(company_id);
    match shifts::decide_swap(&state.client, &scope, &RecordId(id), request.decision) {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(error) => {
            let status = match &error {
                SwapDecisionError::UnknownRequest(_) => StatusCode::NOT_FOUND,
                SwapDecisionError::AlreadyDecided { .. } => StatusCode::CONFLICT,
                SwapDecisionError::UnknownShift { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                SwapDecisionError::Store(store) => store_status(store),
            };
            let payload = json!({
                "error": error.to_string(),
            });
            (status, Json(payload)).into_response()
        }
    }
}

pub(crate) async fn org_tree<S>(
    State(state): State<ApiState<S>>,
    Path(company_id): Path<String>,
) -> Json<Figures<OrgTree>>
where
    S: TableStore + 'static,
{
    let scope = Scope::company(company_id);
    let units = state.client.fetch_list::<OrganizationalUnit>(&scope);
    let roles = state.client.fetch_list::<Role>(&scope);
    Figures::new(
        OrgTree::build(&units.rows, &roles.rows),
        units.degraded || roles.degraded,
    )
}

pub(crate) async fn ai_overview<S>(
    State(state): State<ApiState<S>>,
    Path(company_id): Path<String>,
) -> Json<Figures<GovernanceOverview>>
where
    S: TableStore + 'static,
{
    let models = state
        .client
        .fetch_list::<AiModel>(&Scope::company(company_id));
    Figures::new(GovernanceOverview::from_models(&models.rows), models.degraded)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AgendaParams {
    #[serde(default)]
    from: Option<NaiveDate>,
    #[serde(default)]
    to: Option<NaiveDate>,
}

pub(crate) async fn agenda<S>(
    State(state): State<ApiState<S>>,
    Path(company_id): Path<String>,
    Query(params): Query<AgendaParams>,
) -> Response
where
    S: TableStore + 'static,
{
    let from = params.from.unwrap_or_else(|| Utc::now().date_naive());
    let to = params.to.unwrap_or(from + Duration::days(7));
    if to < from {
        let payload = json!({
            "error": "`to` must not be before `from`",
        });
        return (StatusCode::BAD_REQUEST, Json(payload)).into_response();
    }

    let events = state
        .client
        .fetch_list::<CalendarEvent>(&Scope::company(company_id));
    let window_end = start_of(to + Duration::days(1)) - Duration::seconds(1);
    let payload = json!({
        "from": from,
        "to": to,
        "events": calendar::agenda(&events.rows, start_of(from), window_end),
        "degraded": events.degraded,
    });
    (StatusCode::OK, Json(payload)).into_response()
}

fn start_of(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

pub(crate) async fn session<S>(
    State(state): State<ApiState<S>>,
    Path(company_id): Path<String>,
) -> Response
where
    S: TableStore + 'static,
{
    match state.client.current_user() {
        Ok(Some(user)) if user.company_id.0 == company_id => {
            (StatusCode::OK, Json(json!({ "user": user }))).into_response()
        }
        Ok(Some(_)) => {
            let payload = json!({ "error": "signed in to a different company" });
            (StatusCode::FORBIDDEN, Json(payload)).into_response()
        }
        Ok(None) => {
            let payload = json!({ "error": "not signed in" });
            (StatusCode::UNAUTHORIZED, Json(payload)).into_response()
        }
        Err(error) => {
            let payload = json!({ "error": error.to_string() });
            (store_status(&error), Json(payload)).into_response()
        }
    }
}
