use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::blank_date;
use super::expenses::Expense;
use crate::data::entity::{CompanyId, Draft, Entity, RecordId};
use crate::data::store::Direction;
use crate::views::form::RequiredFields;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Planning,
    Active,
    OnHold,
    Completed,
}

impl ProjectStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Active => "active",
            Self::OnHold => "on_hold",
            Self::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: RecordId,
    pub company_id: CompanyId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub client: Option<String>,
    #[serde(default)]
    pub manager_id: Option<RecordId>,
    pub status: ProjectStatus,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub budget: Option<f64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Entity for Project {
    const TABLE: &'static str = "projects";
    const LABEL: &'static str = "projects";
    const ORDER_BY: (&'static str, Direction) = ("start_date", Direction::Descending);

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.name.as_str()];
        fields.extend(self.client.as_deref());
        fields.extend(self.description.as_deref());
        fields
    }

    fn status(&self) -> Option<&str> {
        Some(self.status.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectDraft {
    pub name: Option<String>,
    pub description: Option<String>,
    pub client: Option<String>,
    pub manager_id: Option<RecordId>,
    pub status: Option<ProjectStatus>,
    #[serde(deserialize_with = "blank_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(deserialize_with = "blank_date")]
    pub end_date: Option<NaiveDate>,
    pub budget: Option<f64>,
}

impl Draft for ProjectDraft {
    type Record = Project;
    const DEFAULT_STATUS: Option<&'static str> = Some("planning");

    fn required(&self) -> RequiredFields {
        RequiredFields::new()
            .text("name", self.name.as_deref())
            .present("start_date", &self.start_date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneStatus {
    Open,
    Reached,
    Missed,
}

impl MilestoneStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Reached => "reached",
            Self::Missed => "missed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Milestone {
    pub id: RecordId,
    pub company_id: CompanyId,
    pub project_id: RecordId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub due_date: NaiveDate,
    pub status: MilestoneStatus,
}

impl Milestone {
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == MilestoneStatus::Open && self.due_date < today
    }
}

impl Entity for Milestone {
    const TABLE: &'static str = "project_milestones";
    const LABEL: &'static str = "milestones";
    const ORDER_BY: (&'static str, Direction) = ("due_date", Direction::Ascending);
    const PROJECT_SCOPED: bool = true;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.title.as_str()];
        fields.extend(self.description.as_deref());
        fields
    }

    fn status(&self) -> Option<&str> {
        Some(self.status.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MilestoneDraft {
    pub project_id: Option<RecordId>,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(deserialize_with = "blank_date")]
    pub due_date: Option<NaiveDate>,
    pub status: Option<MilestoneStatus>,
}

impl Draft for MilestoneDraft {
    type Record = Milestone;
    const DEFAULT_STATUS: Option<&'static str> = Some("open");

    fn required(&self) -> RequiredFields {
        RequiredFields::new()
            .text("project_id", self.project_id.as_ref().map(|id| id.0.as_str()))
            .text("title", self.title.as_deref())
            .present("due_date", &self.due_date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Low,
    Medium,
    High,
}

impl Level {
    pub const fn weight(self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectTask {
    pub id: RecordId,
    pub company_id: CompanyId,
    pub project_id: RecordId,
    pub title: String,
    #[serde(default)]
    pub assignee_id: Option<RecordId>,
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Option<Level>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub estimated_hours: Option<f64>,
}

impl Entity for ProjectTask {
    const TABLE: &'static str = "project_tasks";
    const LABEL: &'static str = "tasks";
    const ORDER_BY: (&'static str, Direction) = ("due_date", Direction::Ascending);
    const PROJECT_SCOPED: bool = true;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.title.as_str()]
    }

    fn status(&self) -> Option<&str> {
        Some(self.status.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectTaskDraft {
    pub project_id: Option<RecordId>,
    pub title: Option<String>,
    pub assignee_id: Option<RecordId>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Level>,
    #[serde(deserialize_with = "blank_date")]
    pub due_date: Option<NaiveDate>,
    pub estimated_hours: Option<f64>,
}

impl Draft for ProjectTaskDraft {
    type Record = ProjectTask;
    const DEFAULT_STATUS: Option<&'static str> = Some("todo");

    fn required(&self) -> RequiredFields {
        RequiredFields::new()
            .text("project_id", self.project_id.as_ref().map(|id| id.0.as_str()))
            .text("title", self.title.as_deref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskStatus {
    Open,
    Mitigated,
    Closed,
}

impl RiskStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Mitigated => "mitigated",
            Self::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRisk {
    pub id: RecordId,
    pub company_id: CompanyId,
    pub project_id: RecordId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub probability: Level,
    pub impact: Level,
    pub status: RiskStatus,
    #[serde(default)]
    pub mitigation: Option<String>,
}

impl ProjectRisk {
    /// Probability weight times impact weight, 1 through 9.
    pub fn score(&self) -> u8 {
        self.probability.weight() * self.impact.weight()
    }

    pub fn severity(&self) -> Level {
        match self.score() {
            0..=2 => Level::Low,
            3..=5 => Level::Medium,
            _ => Level::High,
        }
    }
}

impl Entity for ProjectRisk {
    const TABLE: &'static str = "project_risks";
    const LABEL: &'static str = "risks";
    const ORDER_BY: (&'static str, Direction) = ("title", Direction::Ascending);
    const PROJECT_SCOPED: bool = true;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.title.as_str()];
        fields.extend(self.description.as_deref());
        fields.extend(self.mitigation.as_deref());
        fields
    }

    fn status(&self) -> Option<&str> {
        Some(self.status.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectRiskDraft {
    pub project_id: Option<RecordId>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub probability: Option<Level>,
    pub impact: Option<Level>,
    pub status: Option<RiskStatus>,
    pub mitigation: Option<String>,
}

impl Draft for ProjectRiskDraft {
    type Record = ProjectRisk;
    const DEFAULT_STATUS: Option<&'static str> = Some("open");

    fn required(&self) -> RequiredFields {
        RequiredFields::new()
            .text("project_id", self.project_id.as_ref().map(|id| id.0.as_str()))
            .text("title", self.title.as_deref())
            .present("probability", &self.probability)
            .present("impact", &self.impact)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetOverview {
    pub project_id: RecordId,
    pub budget: f64,
    pub spent: f64,
    pub remaining: f64,
    pub used_pct: f64,
    pub over_budget: bool,
    pub committed_expenses: usize,
}

impl BudgetOverview {
    /// Recomputed from the current expense rows on every request.
    pub fn compute(project: &Project, expenses: &[Expense]) -> Self {
        let committed: Vec<&Expense> = expenses
            .iter()
            .filter(|expense| expense.project_id.as_ref() == Some(&project.id))
            .filter(|expense| expense.status.is_committed())
            .collect();

        let budget = project.budget.unwrap_or_default();
        let spent: f64 = committed.iter().map(|expense| expense.amount).sum();
        let used_pct = if budget > 0.0 {
            spent / budget * 100.0
        } else {
            0.0
        };

        Self {
            project_id: project.id.clone(),
            budget,
            spent,
            remaining: budget - spent,
            used_pct,
            over_budget: spent > budget,
            committed_expenses: committed.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectHealth {
    pub project_id: RecordId,
    pub tasks_total: usize,
    pub tasks_done: usize,
    pub progress_pct: f64,
    pub overdue_milestones: usize,
    pub open_high_risks: usize,
}

impl ProjectHealth {
    pub fn compute(
        project: &Project,
        tasks: &[ProjectTask],
        milestones: &[Milestone],
        risks: &[ProjectRisk],
        today: NaiveDate,
    ) -> Self {
        let tasks: Vec<_> = tasks
            .iter()
            .filter(|task| task.project_id == project.id)
            .collect();
        let tasks_done = tasks
            .iter()
            .filter(|task| task.status == TaskStatus::Done)
            .count();
        let progress_pct = if tasks.is_empty() {
            0.0
        } else {
            tasks_done as f64 / tasks.len() as f64 * 100.0
        };

        Self {
            project_id: project.id.clone(),
            tasks_total: tasks.len(),
            tasks_done,
            progress_pct,
            overdue_milestones: milestones
                .iter()
                .filter(|milestone| milestone.project_id == project.id)
                .filter(|milestone| milestone.is_overdue(today))
                .count(),
            open_high_risks: risks
                .iter()
                .filter(|risk| risk.project_id == project.id)
                .filter(|risk| risk.status == RiskStatus::Open)
                .filter(|risk| risk.severity() == Level::High)
                .count(),
        }
    }
}
