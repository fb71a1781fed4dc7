use crate::infra::{build_client, seed_demo_tenant, week_start};
use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use clap::Args;
use staffdesk::config::AppConfig;
use staffdesk::data::{DataClient, MemoryStore, Scope};
use staffdesk::error::AppError;
use staffdesk::features::ai_governance::{AiModel, AutomationSuggestion, GovernanceOverview};
use staffdesk::features::calendar::{agenda, CalendarEvent};
use staffdesk::features::cards::{CardPortfolio, CompanyCard};
use staffdesk::features::employees::Employee;
use staffdesk::features::expenses::{Expense, ExpenseCsvImporter, ExpenseSummary};
use staffdesk::features::organization::{OrgNode, OrgTree, OrganizationalUnit, Role};
use staffdesk::features::parse_date;
use staffdesk::features::projects::{
    BudgetOverview, Milestone, Project, ProjectHealth, ProjectRisk, ProjectTask,
};
use staffdesk::features::shifts::{
    absence_conflicts, decide_swap, Absence, Shift, ShiftSwapRequest, SwapDecision, SwapStatus,
    WorkloadOverview,
};
use staffdesk::views::{ListFilter, ListView, SubmitOutcome};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct ExpenseReportArgs {
    /// Expense export with Date, Description, Category and Amount columns
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Only show expenses with this status
    #[arg(long)]
    pub(crate) status: Option<String>,
    /// Only show expenses whose description or category contains this text
    #[arg(long)]
    pub(crate) search: Option<String>,
    /// Tenant the imported rows are stored under
    #[arg(long, default_value = "import")]
    pub(crate) company: String,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Tenant to seed and report on
    #[arg(long, default_value = "demo")]
    pub(crate) company: String,
    /// Reference date for the walkthrough (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

pub(crate) fn run_expense_report(args: ExpenseReportArgs) -> Result<(), AppError> {
    let ExpenseReportArgs {
        csv,
        status,
        search,
        company,
    } = args;

    let config = AppConfig::load()?;
    let client = build_client(&config);
    let scope = Scope::company(company);

    let drafts = ExpenseCsvImporter::from_path(&csv)?;
    let mut rejected = 0;
    for draft in drafts {
        match client.create(&scope, draft) {
            SubmitOutcome::Created { .. } => {}
            outcome => {
                rejected += 1;
                println!("  skipped row: {}", outcome.notice().message);
            }
        }
    }

    let filter = ListFilter { search, status };
    let view = ListView::from_outcome(client.fetch_list::<Expense>(&scope), &filter);
    println!(
        "Expense report for {} ({} imported, {} skipped)",
        csv.display(),
        view.total,
        rejected
    );

    if let Some(message) = view.message() {
        println!("  {message}");
        return Ok(());
    }

    let rows = view.into_rows();
    for expense in &rows {
        println!(
            "- {} | {:<24} | {:<12} | {:>10.2} {} | {}",
            expense.expense_date,
            expense.description,
            expense.category,
            expense.amount,
            expense.currency,
            expense.status.label()
        );
    }
    render_expense_summary(&ExpenseSummary::from_expenses(&rows));
    Ok(())
}

fn render_expense_summary(summary: &ExpenseSummary) {
    println!(
        "  {} expenses totalling {:.2}",
        summary.count, summary.total_amount
    );
    for entry in summary.by_status.iter().filter(|entry| entry.count > 0) {
        println!(
            "    {:<10} {:>3} | {:>10.2}",
            entry.status_label, entry.count, entry.amount
        );
    }
    for (category, amount) in &summary.by_category {
        println!("    category {category}: {amount:.2}");
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { company, today } = args;
    let today = today.unwrap_or_else(|| Utc::now().date_naive());

    let config = AppConfig::load()?;
    let client = build_client(&config);
    let scope = Scope::company(company);
    seed_demo_tenant(&client, &scope, today)?;

    println!("StaffDesk demo for tenant '{}' ({today})", scope.company_id);

    render_people(&client, &scope);
    render_finance(&client, &scope);
    render_projects(&client, &scope, today);
    render_planning(&client, &scope, today, config.planning.weekly_capacity_hours);
    render_organization(&client, &scope);
    render_ai_governance(&client, &scope);
    render_agenda(&client, &scope, today);
    render_cache(&client, &scope);

    Ok(())
}

fn render_people(client: &DataClient<MemoryStore>, scope: &Scope) {
    println!("\nEmployees");
    let view = ListView::from_outcome(
        client.fetch_list::<Employee>(scope),
        &ListFilter::default(),
    );
    for employee in view.rows() {
        println!(
            "- [{}] {} ({}) {}",
            employee.initials(),
            employee.full_name(),
            employee.position.as_deref().unwrap_or("-"),
            employee.status.label()
        );
    }

    let filtered = ListView::from_outcome(
        client.fetch_list::<Employee>(scope),
        &ListFilter::search("nobody"),
    );
    if let Some(message) = filtered.message() {
        println!("  search 'nobody': {message}");
    }
}

fn render_finance(client: &DataClient<MemoryStore>, scope: &Scope) {
    println!("\nExpenses");
    let expenses = client.fetch_list::<Expense>(scope).rows;
    render_expense_summary(&ExpenseSummary::from_expenses(&expenses));

    let approved = ListView::from_outcome(
        client.fetch_list::<Expense>(scope),
        &ListFilter::status("approved"),
    );
    println!("  approved filter keeps {} rows", approved.rows().len());

    println!("\nCompany cards");
    let portfolio = CardPortfolio::from_cards(&client.fetch_list::<CompanyCard>(scope).rows);
    for card in &portfolio.cards {
        let flag = if card.near_limit { " (near limit)" } else { "" };
        println!(
            "- {} {} | {:.2} of {:.2} used ({:.0}%){flag}",
            card.card_name,
            card.masked_number,
            card.current_balance,
            card.monthly_limit,
            card.utilization_pct
        );
    }
    println!(
        "  {} active cards, {:.2} of {:.2} total limit used",
        portfolio.active_cards, portfolio.total_balance, portfolio.total_limit
    );
}

fn render_projects(client: &DataClient<MemoryStore>, scope: &Scope, today: NaiveDate) {
    println!("\nProjects");
    for project in client.fetch_list::<Project>(scope).rows {
        let project_scope = scope.clone().with_project(project.id.0.as_str());
        let expenses = client.fetch_list::<Expense>(scope).rows;
        let budget = BudgetOverview::compute(&project, &expenses);
        let health = ProjectHealth::compute(
            &project,
            &client.fetch_list::<ProjectTask>(&project_scope).rows,
            &client.fetch_list::<Milestone>(&project_scope).rows,
            &client.fetch_list::<ProjectRisk>(&project_scope).rows,
            today,
        );

        println!(
            "- {} | budget {:.2}, spent {:.2} ({:.1}%), remaining {:.2}",
            project.name, budget.budget, budget.spent, budget.used_pct, budget.remaining
        );
        println!(
            "  tasks {}/{} done ({:.0}%), {} overdue milestones, {} open high risks",
            health.tasks_done,
            health.tasks_total,
            health.progress_pct,
            health.overdue_milestones,
            health.open_high_risks
        );
    }
}

fn render_planning(
    client: &DataClient<MemoryStore>,
    scope: &Scope,
    today: NaiveDate,
    capacity_hours: f32,
) {
    println!("\nWorkload");
    let employees = client.fetch_list::<Employee>(scope).rows;
    let shifts = client.fetch_list::<Shift>(scope).rows;
    let overview =
        WorkloadOverview::compute(week_start(today), &employees, &shifts, capacity_hours);
    println!("  week {} to {}", overview.week_start, overview.week_end);
    for load in &overview.employees {
        println!(
            "- {:<16} {:>5.1}h / {:>4.1}h ({:.0}%) {}",
            load.employee_name,
            load.planned_hours,
            load.capacity_hours,
            load.utilization_pct,
            load.level.label()
        );
    }

    let absences = client.fetch_list::<Absence>(scope).rows;
    let conflicts = absence_conflicts(&shifts, &absences);
    if conflicts.is_empty() {
        println!("  no shifts collide with approved absences");
    }
    for conflict in conflicts {
        println!(
            "  conflict: shift {} on {} overlaps {} ({})",
            conflict.shift_id, conflict.shift_date, conflict.absence_id, conflict.absence_type
        );
    }

    let pending = client
        .fetch_list::<ShiftSwapRequest>(scope)
        .rows
        .into_iter()
        .find(|request| request.status == SwapStatus::Pending);
    if let Some(request) = pending {
        match decide_swap(client, scope, &request.id, SwapDecision::Approve) {
            Ok(outcome) => match outcome.reassigned_shift {
                Some(shift) => println!(
                    "  swap {} approved: shift {} now staffed by {}",
                    outcome.request.id, shift.id, shift.employee_id
                ),
                None => println!("  swap {} approved", outcome.request.id),
            },
            Err(err) => println!("  swap decision unavailable: {err}"),
        }
    }
}

fn render_organization(client: &DataClient<MemoryStore>, scope: &Scope) {
    println!("\nOrganization");
    let tree = OrgTree::build(
        &client.fetch_list::<OrganizationalUnit>(scope).rows,
        &client.fetch_list::<Role>(scope).rows,
    );
    for root in &tree.roots {
        render_org_node(root, 1);
    }
}

fn render_org_node(node: &OrgNode, depth: usize) {
    let roles = if node.roles.is_empty() {
        String::new()
    } else {
        format!(" [{}]", node.roles.join(", "))
    };
    println!("{}- {}{roles}", "  ".repeat(depth), node.name);
    for child in &node.children {
        render_org_node(child, depth + 1);
    }
}

fn render_ai_governance(client: &DataClient<MemoryStore>, scope: &Scope) {
    println!("\nAI governance");
    let overview = GovernanceOverview::from_models(&client.fetch_list::<AiModel>(scope).rows);
    for model in &overview.models {
        println!(
            "- {} | risk {} | {} | {}",
            model.name,
            model.risk_level.as_str(),
            model.status.as_str(),
            model.compliance_label
        );
    }
    println!(
        "  {} models, {} awaiting DSGVO review",
        overview.total_models, overview.pending_reviews
    );

    for suggestion in client.fetch_list::<AutomationSuggestion>(scope).rows {
        let roi = suggestion
            .roi_percentage
            .map_or_else(|| "n/a".to_string(), |roi| format!("{roi:.0}%"));
        println!(
            "- suggestion '{}': saves {:.2} per year, ROI {roi}",
            suggestion.title, suggestion.annual_savings
        );
    }
}

fn render_agenda(client: &DataClient<MemoryStore>, scope: &Scope, today: NaiveDate) {
    println!("\nAgenda");
    let monday = week_start(today);
    let from = Utc.from_utc_datetime(&monday.and_time(NaiveTime::MIN));
    let to = from + Duration::days(7);
    let events = client.fetch_list::<CalendarEvent>(scope).rows;
    for event in agenda(&events, from, to) {
        println!(
            "- {} {}",
            event.starts_at.format("%a %d.%m. %H:%M"),
            event.title
        );
    }
}

fn render_cache(client: &DataClient<MemoryStore>, scope: &Scope) {
    let outcome = client.fetch_list::<Employee>(scope);
    println!(
        "\nQuery cache: {} keys, '{}' served from cache: {}, fetched {} time(s)",
        client.cache().len(),
        outcome.key,
        outcome.from_cache,
        client.cache().fetch_count(&outcome.key)
    );
}
