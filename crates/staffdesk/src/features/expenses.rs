use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::{blank_date, parse_date};
use crate::data::entity::{CompanyId, Draft, Entity, RecordId};
use crate::data::store::Direction;
use crate::views::form::RequiredFields;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseStatus {
    Pending,
    Approved,
    Rejected,
    Reimbursed,
}

impl ExpenseStatus {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::Pending,
            Self::Approved,
            Self::Rejected,
            Self::Reimbursed,
        ]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Reimbursed => "reimbursed",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::Reimbursed => "Reimbursed",
        }
    }

    /// Approved and reimbursed expenses count against budgets.
    pub const fn is_committed(self) -> bool {
        matches!(self, Self::Approved | Self::Reimbursed)
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ordered()
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(raw.trim()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: RecordId,
    pub company_id: CompanyId,
    #[serde(default)]
    pub employee_id: Option<RecordId>,
    #[serde(default)]
    pub project_id: Option<RecordId>,
    pub description: String,
    pub category: String,
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub expense_date: NaiveDate,
    pub status: ExpenseStatus,
    #[serde(default)]
    pub receipt_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_currency() -> String {
    "EUR".to_string()
}

impl Entity for Expense {
    const TABLE: &'static str = "expenses";
    const LABEL: &'static str = "expenses";
    const ORDER_BY: (&'static str, Direction) = ("expense_date", Direction::Descending);

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.description.as_str(), self.category.as_str()]
    }

    fn status(&self) -> Option<&str> {
        Some(self.status.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpenseDraft {
    pub employee_id: Option<RecordId>,
    pub project_id: Option<RecordId>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    #[serde(deserialize_with = "blank_date")]
    pub expense_date: Option<NaiveDate>,
    pub status: Option<ExpenseStatus>,
    pub receipt_url: Option<String>,
}

impl Draft for ExpenseDraft {
    type Record = Expense;
    const DEFAULT_STATUS: Option<&'static str> = Some("pending");

    fn required(&self) -> RequiredFields {
        RequiredFields::new()
            .text("description", self.description.as_deref())
            .text("category", self.category.as_deref())
            .number("amount", self.amount)
            .present("expense_date", &self.expense_date)
    }

    fn derive(&self, row: &mut crate::data::store::Row) {
        let blank = self
            .currency
            .as_deref()
            .map_or(true, |currency| currency.trim().is_empty());
        if blank {
            row.insert(
                "currency".to_string(),
                serde_json::Value::String(default_currency()),
            );
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusTotal {
    pub count: usize,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusTotalEntry {
    pub status: ExpenseStatus,
    pub status_label: &'static str,
    pub count: usize,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpenseSummary {
    pub count: usize,
    pub total_amount: f64,
    pub by_status: Vec<StatusTotalEntry>,
    pub by_category: BTreeMap<String, f64>,
}

impl ExpenseSummary {
    pub fn from_expenses(expenses: &[Expense]) -> Self {
        let mut by_status: BTreeMap<ExpenseStatus, StatusTotal> = BTreeMap::new();
        let mut by_category: BTreeMap<String, f64> = BTreeMap::new();

        for expense in expenses {
            let total = by_status.entry(expense.status).or_default();
            total.count += 1;
            total.amount += expense.amount;
            *by_category.entry(expense.category.clone()).or_default() += expense.amount;
        }

        let by_status = ExpenseStatus::ordered()
            .into_iter()
            .map(|status| {
                let total = by_status.remove(&status).unwrap_or_default();
                StatusTotalEntry {
                    status,
                    status_label: status.label(),
                    count: total.count,
                    amount: total.amount,
                }
            })
            .collect();

        Self {
            count: expenses.len(),
            total_amount: expenses.iter().map(|expense| expense.amount).sum(),
            by_status,
            by_category,
        }
    }

    pub fn for_status(&self, status: ExpenseStatus) -> Option<&StatusTotalEntry> {
        self.by_status.iter().find(|entry| entry.status == status)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExpenseImportError {
    #[error("failed to read expense export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid expense CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("line {line}: {reason}")]
    Row { line: u64, reason: String },
}

/// Bulk import of expense lists exported from spreadsheets.
pub struct ExpenseCsvImporter;

impl ExpenseCsvImporter {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Vec<ExpenseDraft>, ExpenseImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<ExpenseDraft>, ExpenseImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut drafts = Vec::new();

        for (index, record) in csv_reader.deserialize::<ExpenseCsvRow>().enumerate() {
            let row = record?;
            // header occupies line 1
            let line = index as u64 + 2;
            drafts.push(row.into_draft(line)?);
        }

        Ok(drafts)
    }
}

#[derive(Debug, Deserialize)]
struct ExpenseCsvRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Description")]
    description: String,
    #[serde(rename = "Category")]
    category: String,
    #[serde(rename = "Amount")]
    amount: String,
    #[serde(rename = "Currency", default, deserialize_with = "empty_string_as_none")]
    currency: Option<String>,
    #[serde(rename = "Status", default, deserialize_with = "empty_string_as_none")]
    status: Option<String>,
    #[serde(rename = "Employee", default, deserialize_with = "empty_string_as_none")]
    employee_id: Option<String>,
    #[serde(rename = "Project", default, deserialize_with = "empty_string_as_none")]
    project_id: Option<String>,
}

impl ExpenseCsvRow {
    fn into_draft(self, line: u64) -> Result<ExpenseDraft, ExpenseImportError> {
        let expense_date =
            parse_date(&self.date).map_err(|reason| ExpenseImportError::Row { line, reason })?;

        let amount = parse_amount(&self.amount).ok_or_else(|| ExpenseImportError::Row {
            line,
            reason: format!("amount '{}' is not a number", self.amount),
        })?;

        let status = match self.status {
            Some(raw) => Some(ExpenseStatus::parse(&raw).ok_or_else(|| {
                ExpenseImportError::Row {
                    line,
                    reason: format!("unknown status '{raw}'"),
                }
            })?),
            None => None,
        };

        Ok(ExpenseDraft {
            employee_id: self.employee_id.map(RecordId),
            project_id: self.project_id.map(RecordId),
            description: Some(self.description),
            category: Some(self.category),
            amount: Some(amount),
            currency: self.currency,
            expense_date: Some(expense_date),
            status,
            receipt_url: None,
        })
    }
}

/// Reads plain, US ("1,234.50") and German ("1.234,50") amounts. The
/// separator that comes last is the decimal one. A lone comma followed by
/// exactly three digits could be either and is refused.
fn parse_amount(raw: &str) -> Option<f64> {
    let value = raw.trim().trim_matches('€').trim();
    let commas = value.matches(',').count();
    let dots = value.matches('.').count();

    let (group, decimal) = match (value.rfind(','), value.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => (Some('.'), Some(',')),
        (Some(_), Some(_)) => (Some(','), Some('.')),
        (Some(comma), None) if commas == 1 => {
            if value.len() - comma - 1 == 3 {
                return None;
            }
            (None, Some(','))
        }
        (Some(_), None) => (Some(','), None),
        (None, Some(_)) if dots > 1 => (Some('.'), None),
        _ => (None, Some('.')),
    };

    let (integer, fraction) = match decimal.and_then(|sep| value.rsplit_once(sep)) {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (value, None),
    };
    if decimal.is_some_and(|sep| integer.contains(sep)) {
        return None;
    }

    let digits = match group {
        Some(sep) => {
            let groups: Vec<&str> = integer.split(sep).collect();
            let (head, tail) = groups.split_first()?;
            let head_len = head.trim_start_matches('-').len();
            if !(1..=3).contains(&head_len) || tail.iter().any(|group| group.len() != 3) {
                return None;
            }
            groups.concat()
        }
        None => integer.to_string(),
    };

    let normalized = match fraction {
        Some(fraction) => format!("{digits}.{fraction}"),
        None => digits,
    };
    normalized.parse::<f64>().ok().filter(|amount| amount.is_finite())
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }))
}
