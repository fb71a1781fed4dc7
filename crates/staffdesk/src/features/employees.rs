use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::blank_date;
use crate::data::entity::{CompanyId, Draft, Entity, RecordId};
use crate::data::store::Direction;
use crate::views::form::RequiredFields;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentStatus {
    Onboarding,
    Active,
    Inactive,
}

impl EmploymentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Onboarding => "Onboarding",
            Self::Active => "Active",
            Self::Inactive => "Inactive",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Onboarding => "onboarding",
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: RecordId,
    pub company_id: CompanyId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub employment_type: Option<String>,
    pub status: EmploymentStatus,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub weekly_hours: Option<f32>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn initials(&self) -> String {
        self.first_name
            .chars()
            .next()
            .into_iter()
            .chain(self.last_name.chars().next())
            .flat_map(char::to_uppercase)
            .collect()
    }
}

impl Entity for Employee {
    const TABLE: &'static str = "employees";
    const LABEL: &'static str = "employees";
    const ORDER_BY: (&'static str, Direction) = ("last_name", Direction::Ascending);

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![
            self.first_name.as_str(),
            self.last_name.as_str(),
            self.email.as_str(),
        ];
        fields.extend(self.position.as_deref());
        fields.extend(self.department.as_deref());
        fields
    }

    fn status(&self) -> Option<&str> {
        Some(self.status.as_str())
    }
}

/// Values collected by the "add employee" dialog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmployeeDraft {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub position: Option<String>,
    pub department: Option<String>,
    pub employment_type: Option<String>,
    pub status: Option<EmploymentStatus>,
    #[serde(deserialize_with = "blank_date")]
    pub start_date: Option<NaiveDate>,
    pub weekly_hours: Option<f32>,
}

impl Draft for EmployeeDraft {
    type Record = Employee;
    const DEFAULT_STATUS: Option<&'static str> = Some("onboarding");

    fn required(&self) -> RequiredFields {
        RequiredFields::new()
            .text("first_name", self.first_name.as_deref())
            .text("last_name", self.last_name.as_deref())
            .text("email", self.email.as_deref())
    }
}
