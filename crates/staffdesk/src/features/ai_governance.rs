use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::data::entity::{CompanyId, Draft, Entity, RecordId};
use crate::data::store::{Direction, Row};
use crate::views::form::RequiredFields;

/// Working weeks and hourly rate behind the savings estimate.
pub const WEEKS_PER_YEAR: f64 = 52.0;
pub const HOURLY_RATE: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Minimal,
    Limited,
    High,
}

impl RiskLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Limited => "limited",
            Self::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    Evaluation,
    Approved,
    Retired,
}

impl ModelStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Evaluation => "evaluation",
            Self::Approved => "approved",
            Self::Retired => "retired",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiModel {
    pub id: RecordId,
    pub company_id: CompanyId,
    pub name: String,
    pub provider: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub use_case: Option<String>,
    pub risk_level: RiskLevel,
    pub status: ModelStatus,
    #[serde(default)]
    pub dsgvo_compliant: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl AiModel {
    pub fn compliance_label(&self) -> &'static str {
        if self.dsgvo_compliant {
            "DSGVO-konform"
        } else {
            "DSGVO-Prüfung ausstehend"
        }
    }
}

impl Entity for AiModel {
    const TABLE: &'static str = "ai_models";
    const LABEL: &'static str = "AI models";
    const ORDER_BY: (&'static str, Direction) = ("name", Direction::Ascending);

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.name.as_str(), self.provider.as_str()];
        fields.extend(self.use_case.as_deref());
        fields
    }

    fn status(&self) -> Option<&str> {
        Some(self.status.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AiModelDraft {
    pub name: Option<String>,
    pub provider: Option<String>,
    pub version: Option<String>,
    pub use_case: Option<String>,
    pub risk_level: Option<RiskLevel>,
    pub status: Option<ModelStatus>,
    pub dsgvo_compliant: bool,
}

impl Draft for AiModelDraft {
    type Record = AiModel;
    const DEFAULT_STATUS: Option<&'static str> = Some("evaluation");

    fn required(&self) -> RequiredFields {
        RequiredFields::new()
            .text("name", self.name.as_deref())
            .text("provider", self.provider.as_deref())
            .present("risk_level", &self.risk_level)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelCompliance {
    pub model_id: RecordId,
    pub name: String,
    pub risk_level: RiskLevel,
    pub status: ModelStatus,
    pub compliance_label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GovernanceOverview {
    pub total_models: usize,
    pub by_risk_level: BTreeMap<&'static str, usize>,
    pub by_status: BTreeMap<&'static str, usize>,
    pub pending_reviews: usize,
    pub models: Vec<ModelCompliance>,
}

impl GovernanceOverview {
    pub fn from_models(models: &[AiModel]) -> Self {
        let mut by_risk_level = BTreeMap::new();
        let mut by_status = BTreeMap::new();
        for model in models {
            *by_risk_level.entry(model.risk_level.as_str()).or_default() += 1;
            *by_status.entry(model.status.as_str()).or_default() += 1;
        }

        Self {
            total_models: models.len(),
            by_risk_level,
            by_status,
            pending_reviews: models.iter().filter(|model| !model.dsgvo_compliant).count(),
            models: models
                .iter()
                .map(|model| ModelCompliance {
                    model_id: model.id.clone(),
                    name: model.name.clone(),
                    risk_level: model.risk_level,
                    status: model.status,
                    compliance_label: model.compliance_label(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionStatus {
    Proposed,
    Approved,
    Implemented,
    Rejected,
}

impl SuggestionStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Proposed => "proposed",
            Self::Approved => "approved",
            Self::Implemented => "implemented",
            Self::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationSuggestion {
    pub id: RecordId,
    pub company_id: CompanyId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub process_area: Option<String>,
    pub potential_time_saved_hours: f64,
    pub implementation_cost: f64,
    #[serde(default)]
    pub annual_savings: f64,
    #[serde(default)]
    pub roi_percentage: Option<f64>,
    pub status: SuggestionStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Entity for AutomationSuggestion {
    const TABLE: &'static str = "automation_suggestions";
    const LABEL: &'static str = "automation suggestions";
    const ORDER_BY: (&'static str, Direction) = ("created_at", Direction::Descending);

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.title.as_str()];
        fields.extend(self.description.as_deref());
        fields.extend(self.process_area.as_deref());
        fields
    }

    fn status(&self) -> Option<&str> {
        Some(self.status.as_str())
    }

    fn rederive(row: &mut Row) {
        let column = |name: &str| row.get(name).and_then(Value::as_f64).unwrap_or_default();
        let hours = column("potential_time_saved_hours");
        let cost = column("implementation_cost");
        write_figures(row, hours, cost);
    }
}

fn write_figures(row: &mut Row, weekly_hours: f64, implementation_cost: f64) {
    let savings = annual_savings(weekly_hours);
    row.insert("annual_savings".to_string(), json!(savings));
    row.insert(
        "roi_percentage".to_string(),
        json!(roi_percentage(savings, implementation_cost)),
    );
}

/// Yearly savings for a weekly number of saved hours.
pub fn annual_savings(weekly_hours: f64) -> f64 {
    weekly_hours * WEEKS_PER_YEAR * HOURLY_RATE
}

/// Return on investment in percent, undefined without a cost.
pub fn roi_percentage(annual_savings: f64, implementation_cost: f64) -> Option<f64> {
    if implementation_cost == 0.0 || !implementation_cost.is_finite() {
        return None;
    }
    Some((annual_savings - implementation_cost) / implementation_cost * 100.0)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationSuggestionDraft {
    pub title: Option<String>,
    pub description: Option<String>,
    pub process_area: Option<String>,
    pub potential_time_saved_hours: Option<f64>,
    pub implementation_cost: Option<f64>,
    pub status: Option<SuggestionStatus>,
}

impl Draft for AutomationSuggestionDraft {
    type Record = AutomationSuggestion;
    const DEFAULT_STATUS: Option<&'static str> = Some("proposed");

    fn required(&self) -> RequiredFields {
        RequiredFields::new()
            .text("title", self.title.as_deref())
            .number("potential_time_saved_hours", self.potential_time_saved_hours)
            .number("implementation_cost", self.implementation_cost)
    }

    fn derive(&self, row: &mut Row) {
        write_figures(
            row,
            self.potential_time_saved_hours.unwrap_or_default(),
            self.implementation_cost.unwrap_or_default(),
        );
    }
}
