//! JSON API over the feature modules.
//!
//! Every tenant resource lives under `/api/v1/companies/:company_id/` and gets
//! the same list/create/update trio; dashboards add read-only derived views.

mod dashboards;
mod records;
#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::data::{DataClient, Draft, TableStore};
use crate::features::ai_governance::{AiModelDraft, AutomationSuggestionDraft};
use crate::features::calendar::CalendarEventDraft;
use crate::features::cards::CompanyCardDraft;
use crate::features::employees::EmployeeDraft;
use crate::features::expenses::ExpenseDraft;
use crate::features::organization::{OrganizationalUnitDraft, RoleDraft};
use crate::features::projects::{
    MilestoneDraft, ProjectDraft, ProjectRiskDraft, ProjectTaskDraft,
};
use crate::features::shifts::{AbsenceDraft, ShiftDraft, ShiftSwapDraft};

pub use records::{ListParams, ListResponse};

const COMPANY_PREFIX: &str = "/api/v1/companies/:company_id";

/// Shared handler state.
pub struct ApiState<S> {
    pub client: Arc<DataClient<S>>,
    pub weekly_capacity_hours: f32,
}

impl<S> ApiState<S> {
    pub fn new(client: Arc<DataClient<S>>, weekly_capacity_hours: f32) -> Self {
        Self {
            client,
            weekly_capacity_hours,
        }
    }
}

impl<S> Clone for ApiState<S> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            weekly_capacity_hours: self.weekly_capacity_hours,
        }
    }
}

pub fn api_router<S>(state: ApiState<S>) -> Router
where
    S: TableStore + 'static,
{
    let router = Router::new();
    let router = resource::<S, EmployeeDraft>(router, "employees");
    let router = resource::<S, ExpenseDraft>(router, "expenses");
    let router = resource::<S, CompanyCardDraft>(router, "cards");
    let router = resource::<S, ProjectDraft>(router, "projects");
    let router = resource::<S, MilestoneDraft>(router, "milestones");
    let router = resource::<S, ProjectTaskDraft>(router, "tasks");
    let router = resource::<S, ProjectRiskDraft>(router, "risks");
    let router = resource::<S, ShiftDraft>(router, "shifts");
    let router = resource::<S, AbsenceDraft>(router, "absences");
    let router = resource::<S, ShiftSwapDraft>(router, "shift-swaps");
    let router = resource::<S, OrganizationalUnitDraft>(router, "org-units");
    let router = resource::<S, RoleDraft>(router, "roles");
    let router = resource::<S, AiModelDraft>(router, "ai-models");
    let router = resource::<S, AutomationSuggestionDraft>(router, "automation-suggestions");
    let router = resource::<S, CalendarEventDraft>(router, "calendar-events");

    router
        .route(
            &company_path("expenses/summary"),
            get(dashboards::expense_summary::<S>),
        )
        .route(&company_path("cards/usage"), get(dashboards::card_usage::<S>))
        .route(
            &company_path("projects/:id/budget"),
            get(dashboards::project_budget::<S>),
        )
        .route(&company_path("workload"), get(dashboards::workload::<S>))
        .route(
            &company_path("absences/conflicts"),
            get(dashboards::absence_conflicts::<S>),
        )
        .route(
            &company_path("shift-swaps/:id/decision"),
            post(dashboards::decide_swap::<S>),
        )
        .route(&company_path("org-units/tree"), get(dashboards::org_tree::<S>))
        .route(
            &company_path("ai-models/overview"),
            get(dashboards::ai_overview::<S>),
        )
        .route(&company_path("calendar/agenda"), get(dashboards::agenda::<S>))
        .route(&company_path("session"), get(dashboards::session::<S>))
        .with_state(state)
}

fn company_path(suffix: &str) -> String {
    format!("{COMPANY_PREFIX}/{suffix}")
}

fn resource<S, D>(router: Router<ApiState<S>>, path: &str) -> Router<ApiState<S>>
where
    S: TableStore + 'static,
    D: Draft,
{
    router
        .route(
            &company_path(path),
            get(records::list_records::<S, D::Record>).post(records::create_record::<S, D>),
        )
        .route(
            &company_path(&format!("{path}/:id")),
            axum::routing::patch(records::update_record::<S, D::Record>),
        )
}
