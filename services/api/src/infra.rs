use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use staffdesk::config::AppConfig;
use staffdesk::data::{
    DataClient, Draft, Entity, MemoryStore, QueryCache, RecordId, Scope, StoreError,
};
use staffdesk::error::AppError;
use staffdesk::features::ai_governance::{AiModelDraft, AutomationSuggestionDraft, RiskLevel};
use staffdesk::features::calendar::CalendarEventDraft;
use staffdesk::features::cards::CompanyCardDraft;
use staffdesk::features::employees::{EmployeeDraft, EmploymentStatus};
use staffdesk::features::expenses::{ExpenseDraft, ExpenseStatus};
use staffdesk::features::organization::{OrganizationalUnitDraft, RoleDraft};
use staffdesk::features::projects::{
    Level, MilestoneDraft, ProjectDraft, ProjectRiskDraft, ProjectStatus, ProjectTaskDraft,
    TaskStatus,
};
use staffdesk::features::shifts::{AbsenceDraft, AbsenceStatus, ShiftDraft, ShiftSwapDraft};
use staffdesk::views::SubmitOutcome;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn build_client(config: &AppConfig) -> DataClient<MemoryStore> {
    DataClient::new(
        Arc::new(MemoryStore::new()),
        QueryCache::new(config.cache.stale_after),
    )
}

/// Monday of the week containing `date`.
pub(crate) fn week_start(date: NaiveDate) -> NaiveDate {
    use chrono::Datelike;
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

fn seed<D: Draft>(
    client: &DataClient<MemoryStore>,
    scope: &Scope,
    draft: D,
) -> Result<RecordId, AppError> {
    match client.create(scope, draft) {
        SubmitOutcome::Created { record, .. } => Ok(record.id().clone()),
        SubmitOutcome::Invalid { notice, .. } => {
            Err(AppError::Store(StoreError::Rejected(notice.message)))
        }
        SubmitOutcome::Failed { error, .. } => Err(AppError::Store(error)),
    }
}

fn text(value: &str) -> Option<String> {
    Some(value.to_string())
}

fn clock(hour: u32) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(hour, 0, 0)
}

/// Fills one tenant with a small but complete data set for demos.
pub(crate) fn seed_demo_tenant(
    client: &DataClient<MemoryStore>,
    scope: &Scope,
    today: NaiveDate,
) -> Result<(), AppError> {
    let monday = week_start(today);

    let mut staff = Vec::new();
    for (first, last, position, hours, status) in [
        ("Lena", "Fischer", "HR Manager", 40.0, EmploymentStatus::Active),
        ("Jonas", "Weber", "Shift Lead", 40.0, EmploymentStatus::Active),
        ("Aylin", "Demir", "Service Staff", 20.0, EmploymentStatus::Active),
        ("Tom", "Becker", "Trainee", 30.0, EmploymentStatus::Onboarding),
    ] {
        let id = seed(
            client,
            scope,
            EmployeeDraft {
                first_name: text(first),
                last_name: text(last),
                email: Some(format!(
                    "{}.{}@example.com",
                    first.to_lowercase(),
                    last.to_lowercase()
                )),
                position: text(position),
                department: text("Operations"),
                status: Some(status),
                start_date: Some(today - Duration::days(400)),
                weekly_hours: Some(hours),
                ..EmployeeDraft::default()
            },
        )?;
        staff.push(id);
    }

    let project = seed(
        client,
        scope,
        ProjectDraft {
            name: text("Website Relaunch"),
            client: text("Internal"),
            manager_id: Some(staff[0].clone()),
            status: Some(ProjectStatus::Active),
            start_date: Some(today - Duration::days(30)),
            end_date: Some(today + Duration::days(60)),
            budget: Some(12_000.0),
            ..ProjectDraft::default()
        },
    )?;
    let project_scope = scope.clone().with_project(project.0.as_str());

    for (title, status, priority) in [
        ("Wireframes", TaskStatus::Done, Level::Medium),
        ("Content migration", TaskStatus::InProgress, Level::High),
        ("Launch checklist", TaskStatus::Todo, Level::Low),
    ] {
        seed(
            client,
            &project_scope,
            ProjectTaskDraft {
                title: text(title),
                assignee_id: Some(staff[1].clone()),
                status: Some(status),
                priority: Some(priority),
                due_date: Some(today + Duration::days(14)),
                ..ProjectTaskDraft::default()
            },
        )?;
    }
    seed(
        client,
        &project_scope,
        MilestoneDraft {
            title: text("Design sign-off"),
            due_date: Some(today - Duration::days(3)),
            ..MilestoneDraft::default()
        },
    )?;
    seed(
        client,
        &project_scope,
        ProjectRiskDraft {
            title: text("Agency capacity"),
            probability: Some(Level::High),
            impact: Some(Level::High),
            mitigation: text("Book a second agency slot"),
            ..ProjectRiskDraft::default()
        },
    )?;

    for (description, category, amount, status, project_id) in [
        ("Agency invoice", "services", 4_800.0, ExpenseStatus::Approved, Some(&project)),
        ("Stock photos", "marketing", 320.0, ExpenseStatus::Reimbursed, Some(&project)),
        ("Train to Hamburg", "travel", 89.9, ExpenseStatus::Pending, None),
        ("Team lunch", "meals", 146.5, ExpenseStatus::Approved, None),
        ("Conference ticket", "training", 690.0, ExpenseStatus::Rejected, None),
    ] {
        seed(
            client,
            scope,
            ExpenseDraft {
                employee_id: Some(staff[1].clone()),
                project_id: project_id.cloned(),
                description: text(description),
                category: text(category),
                amount: Some(amount),
                expense_date: Some(today - Duration::days(7)),
                status: Some(status),
                ..ExpenseDraft::default()
            },
        )?;
    }

    for (card_name, holder, last_four, limit, balance) in [
        ("Travel Visa", "Jonas Weber", "4242", 2_000.0, 1_870.0),
        ("Marketing Mastercard", "Lena Fischer", "5151", 5_000.0, 1_200.0),
    ] {
        seed(
            client,
            scope,
            CompanyCardDraft {
                card_name: text(card_name),
                holder_name: text(holder),
                last_four: text(last_four),
                card_type: text("credit"),
                monthly_limit: Some(limit),
                current_balance: Some(balance),
                ..CompanyCardDraft::default()
            },
        )?;
    }

    let mut first_shift = None;
    for (offset, employee, start, end) in [
        (0, 1, 6, 14),
        (1, 1, 6, 16),
        (2, 1, 14, 22),
        (3, 1, 22, 8),
        (4, 1, 6, 16),
        (0, 2, 10, 14),
        (2, 2, 10, 14),
    ] {
        let id = seed(
            client,
            scope,
            ShiftDraft {
                employee_id: Some(staff[employee].clone()),
                shift_date: Some(monday + Duration::days(offset)),
                start_time: clock(start),
                end_time: clock(end),
                role: text("Front desk"),
                ..ShiftDraft::default()
            },
        )?;
        first_shift.get_or_insert(id);
    }

    seed(
        client,
        scope,
        AbsenceDraft {
            employee_id: Some(staff[2].clone()),
            start_date: Some(monday + Duration::days(2)),
            end_date: Some(monday + Duration::days(3)),
            absence_type: text("vacation"),
            status: Some(AbsenceStatus::Approved),
            ..AbsenceDraft::default()
        },
    )?;

    if let Some(shift) = first_shift {
        seed(
            client,
            scope,
            ShiftSwapDraft {
                requester_id: Some(staff[1].clone()),
                shift_id: Some(shift),
                target_employee_id: Some(staff[3].clone()),
                reason: text("Doctor's appointment"),
                ..ShiftSwapDraft::default()
            },
        )?;
    }

    let board = seed(
        client,
        scope,
        OrganizationalUnitDraft {
            name: text("Management Board"),
            unit_type: text("board"),
            manager_id: Some(staff[0].clone()),
            ..OrganizationalUnitDraft::default()
        },
    )?;
    for name in ["Operations", "People & Culture"] {
        let unit = seed(
            client,
            scope,
            OrganizationalUnitDraft {
                name: text(name),
                unit_type: text("department"),
                parent_id: Some(board.clone()),
                ..OrganizationalUnitDraft::default()
            },
        )?;
        seed(
            client,
            scope,
            RoleDraft {
                name: Some(format!("{name} Lead")),
                unit_id: Some(unit),
                permissions: vec!["records.read".to_string(), "records.write".to_string()],
                ..RoleDraft::default()
            },
        )?;
    }

    for (name, provider, risk, compliant) in [
        ("Support Assistant", "Mistral", RiskLevel::Limited, true),
        ("CV Screening", "OpenAI", RiskLevel::High, false),
    ] {
        seed(
            client,
            scope,
            AiModelDraft {
                name: text(name),
                provider: text(provider),
                risk_level: Some(risk),
                dsgvo_compliant: compliant,
                ..AiModelDraft::default()
            },
        )?;
    }
    seed(
        client,
        scope,
        AutomationSuggestionDraft {
            title: text("Automate receipt capture"),
            process_area: text("Finance"),
            potential_time_saved_hours: Some(10.0),
            implementation_cost: Some(1_000.0),
            ..AutomationSuggestionDraft::default()
        },
    )?;

    let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN);
    let starts_at = Utc.from_utc_datetime(&(monday + Duration::days(1)).and_time(nine));
    seed(
        client,
        scope,
        CalendarEventDraft {
            title: text("Quarterly all-hands"),
            starts_at: Some(starts_at),
            ends_at: Some(starts_at + Duration::hours(1)),
            event_type: text("meeting"),
            ..CalendarEventDraft::default()
        },
    )?;

    info!(company = %scope.company_id, "demo tenant seeded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use staffdesk::features::employees::Employee;
    use staffdesk::features::expenses::Expense;

    #[test]
    fn week_start_is_monday() {
        let thursday = NaiveDate::from_ymd_opt(2025, 6, 5).expect("valid date");
        assert_eq!(
            week_start(thursday),
            NaiveDate::from_ymd_opt(2025, 6, 2).expect("valid date")
        );
    }

    #[test]
    fn demo_tenant_seeds_every_table() {
        let client = DataClient::new(Arc::new(MemoryStore::new()), QueryCache::default());
        let scope = Scope::company("demo");
        let today = NaiveDate::from_ymd_opt(2025, 6, 5).expect("valid date");

        seed_demo_tenant(&client, &scope, today).expect("seeding succeeds");

        assert_eq!(client.fetch_list::<Employee>(&scope).rows.len(), 4);
        assert_eq!(client.fetch_list::<Expense>(&scope).rows.len(), 5);
        for table in [
            "company_cards",
            "projects",
            "project_tasks",
            "project_milestones",
            "project_risks",
            "shifts",
            "absences",
            "shift_swap_requests",
            "organizational_units",
            "roles",
            "ai_models",
            "automation_suggestions",
            "calendar_events",
        ] {
            assert!(client.store().row_count(table) > 0, "{table} is empty");
        }
    }
}
