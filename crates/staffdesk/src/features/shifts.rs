use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::blank_date;
use super::employees::{Employee, EmploymentStatus};
use crate::data::client::DataClient;
use crate::data::entity::{CompanyId, Draft, Entity, RecordId, Scope};
use crate::data::store::{Direction, Row, StoreError, TableStore};
use crate::views::form::RequiredFields;

/// Below this share of capacity an employee counts as underutilized.
pub const UNDERUTILIZED_BELOW_PCT: f32 = 70.0;
pub const OVERLOADED_ABOVE_PCT: f32 = 100.0;

mod clock {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn parse(raw: &str) -> Option<NaiveTime> {
        let raw = raw.trim();
        NaiveTime::parse_from_str(raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .ok()
    }

    pub(super) fn serialize<S: Serializer>(
        time: &NaiveTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("'{raw}' is not a HH:MM time")))
    }

    pub(super) mod optional {
        use chrono::NaiveTime;
        use serde::{Deserialize, Deserializer, Serializer};

        pub(in super::super) fn serialize<S: Serializer>(
            time: &Option<NaiveTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match time {
                Some(time) => super::serialize(time, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub(in super::super) fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveTime>, D::Error> {
            let raw = Option::<String>::deserialize(deserializer)?;
            match raw.as_deref().map(str::trim) {
                None | Some("") => Ok(None),
                Some(value) => super::parse(value).map(Some).ok_or_else(|| {
                    serde::de::Error::custom(format!("'{value}' is not a HH:MM time"))
                }),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftStatus {
    Planned,
    Confirmed,
}

impl ShiftStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Confirmed => "confirmed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shift {
    pub id: RecordId,
    pub company_id: CompanyId,
    pub employee_id: RecordId,
    pub shift_date: NaiveDate,
    #[serde(with = "clock")]
    pub start_time: NaiveTime,
    #[serde(with = "clock")]
    pub end_time: NaiveTime,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub status: ShiftStatus,
}

impl Shift {
    /// Shift length in hours; an end at or before the start runs past midnight.
    pub fn hours(&self) -> f32 {
        let mut span = self.end_time - self.start_time;
        if span <= Duration::zero() {
            span = span + Duration::days(1);
        }
        span.num_minutes() as f32 / 60.0
    }
}

impl Entity for Shift {
    const TABLE: &'static str = "shifts";
    const LABEL: &'static str = "shifts";
    const ORDER_BY: (&'static str, Direction) = ("shift_date", Direction::Ascending);

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.employee_id.0.as_str()];
        fields.extend(self.role.as_deref());
        fields.extend(self.location.as_deref());
        fields
    }

    fn status(&self) -> Option<&str> {
        Some(self.status.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShiftDraft {
    pub employee_id: Option<RecordId>,
    #[serde(deserialize_with = "blank_date")]
    pub shift_date: Option<NaiveDate>,
    #[serde(with = "clock::optional")]
    pub start_time: Option<NaiveTime>,
    #[serde(with = "clock::optional")]
    pub end_time: Option<NaiveTime>,
    pub role: Option<String>,
    pub location: Option<String>,
    pub status: Option<ShiftStatus>,
}

impl Draft for ShiftDraft {
    type Record = Shift;
    const DEFAULT_STATUS: Option<&'static str> = Some("planned");

    fn required(&self) -> RequiredFields {
        RequiredFields::new()
            .text("employee_id", self.employee_id.as_ref().map(|id| id.0.as_str()))
            .present("shift_date", &self.shift_date)
            .present("start_time", &self.start_time)
            .present("end_time", &self.end_time)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbsenceStatus {
    Requested,
    Approved,
    Rejected,
}

impl AbsenceStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Absence {
    pub id: RecordId,
    pub company_id: CompanyId,
    pub employee_id: RecordId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub absence_type: String,
    pub status: AbsenceStatus,
    #[serde(default)]
    pub note: Option<String>,
}

impl Absence {
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

impl Entity for Absence {
    const TABLE: &'static str = "absences";
    const LABEL: &'static str = "absences";
    const ORDER_BY: (&'static str, Direction) = ("start_date", Direction::Ascending);

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.employee_id.0.as_str(), self.absence_type.as_str()];
        fields.extend(self.note.as_deref());
        fields
    }

    fn status(&self) -> Option<&str> {
        Some(self.status.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AbsenceDraft {
    pub employee_id: Option<RecordId>,
    #[serde(deserialize_with = "blank_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(deserialize_with = "blank_date")]
    pub end_date: Option<NaiveDate>,
    pub absence_type: Option<String>,
    pub status: Option<AbsenceStatus>,
    pub note: Option<String>,
}

impl Draft for AbsenceDraft {
    type Record = Absence;
    const DEFAULT_STATUS: Option<&'static str> = Some("requested");

    fn required(&self) -> RequiredFields {
        RequiredFields::new()
            .text("employee_id", self.employee_id.as_ref().map(|id| id.0.as_str()))
            .present("start_date", &self.start_date)
            .present("end_date", &self.end_date)
            .text("absence_type", self.absence_type.as_deref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapStatus {
    Pending,
    Approved,
    Declined,
}

impl SwapStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Declined => "declined",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftSwapRequest {
    pub id: RecordId,
    pub company_id: CompanyId,
    pub requester_id: RecordId,
    pub shift_id: RecordId,
    #[serde(default)]
    pub target_employee_id: Option<RecordId>,
    pub reason: String,
    pub status: SwapStatus,
}

impl Entity for ShiftSwapRequest {
    const TABLE: &'static str = "shift_swap_requests";
    const LABEL: &'static str = "shift swap requests";
    const ORDER_BY: (&'static str, Direction) = ("created_at", Direction::Descending);

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.reason.as_str(), self.requester_id.0.as_str()]
    }

    fn status(&self) -> Option<&str> {
        Some(self.status.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShiftSwapDraft {
    pub requester_id: Option<RecordId>,
    pub shift_id: Option<RecordId>,
    pub target_employee_id: Option<RecordId>,
    pub reason: Option<String>,
    pub status: Option<SwapStatus>,
}

impl Draft for ShiftSwapDraft {
    type Record = ShiftSwapRequest;
    const DEFAULT_STATUS: Option<&'static str> = Some("pending");

    fn required(&self) -> RequiredFields {
        RequiredFields::new()
            .text("requester_id", self.requester_id.as_ref().map(|id| id.0.as_str()))
            .text("shift_id", self.shift_id.as_ref().map(|id| id.0.as_str()))
            .text("reason", self.reason.as_deref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapDecision {
    Approve,
    Decline,
}

#[derive(Debug, Clone, Serialize)]
pub struct SwapDecisionOutcome {
    pub request: ShiftSwapRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reassigned_shift: Option<Shift>,
}

#[derive(Debug, thiserror::Error)]
pub enum SwapDecisionError {
    #[error("swap request {0} does not exist")]
    UnknownRequest(RecordId),
    #[error("swap request {id} was already {status}")]
    AlreadyDecided { id: RecordId, status: &'static str },
    #[error("swap request {request} refers to shift {shift}, which does not exist")]
    UnknownShift { request: RecordId, shift: RecordId },
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn status_patch(status: SwapStatus) -> Row {
    let mut patch = Row::new();
    patch.insert("status".to_string(), Value::String(status.as_str().to_string()));
    patch
}

/// Records the decision on a pending swap; approval hands the shift to the
/// target employee when one was named.
pub fn decide_swap<S: TableStore + 'static>(
    client: &DataClient<S>,
    scope: &Scope,
    id: &RecordId,
    decision: SwapDecision,
) -> Result<SwapDecisionOutcome, SwapDecisionError> {
    let pending = client
        .find::<ShiftSwapRequest>(scope, id)?
        .ok_or_else(|| SwapDecisionError::UnknownRequest(id.clone()))?;

    if pending.status != SwapStatus::Pending {
        return Err(SwapDecisionError::AlreadyDecided {
            id: id.clone(),
            status: pending.status.as_str(),
        });
    }

    // the shift is checked first so a refused approval leaves the request pending
    let target = match (decision, &pending.target_employee_id) {
        (SwapDecision::Approve, Some(target)) => {
            if client.find::<Shift>(scope, &pending.shift_id)?.is_none() {
                return Err(SwapDecisionError::UnknownShift {
                    request: id.clone(),
                    shift: pending.shift_id.clone(),
                });
            }
            Some(target.clone())
        }
        _ => None,
    };

    let status = match decision {
        SwapDecision::Approve => SwapStatus::Approved,
        SwapDecision::Decline => SwapStatus::Declined,
    };
    let request: ShiftSwapRequest = client.update(scope, id, status_patch(status))?;

    let reassigned_shift = match target {
        Some(target) => {
            let mut patch = Row::new();
            patch.insert("employee_id".to_string(), Value::String(target.0));
            match client.update::<Shift>(scope, &request.shift_id, patch) {
                Ok(shift) => Some(shift),
                Err(err) => {
                    let reopen = status_patch(SwapStatus::Pending);
                    if let Err(revert_err) = client.update::<ShiftSwapRequest>(scope, id, reopen) {
                        warn!(%id, error = %revert_err, "could not reopen swap request");
                    }
                    return Err(err.into());
                }
            }
        }
        None => None,
    };

    Ok(SwapDecisionOutcome {
        request,
        reassigned_shift,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadLevel {
    Underutilized,
    Balanced,
    Overloaded,
}

impl LoadLevel {
    pub fn classify(utilization_pct: f32) -> Self {
        if utilization_pct > OVERLOADED_ABOVE_PCT {
            Self::Overloaded
        } else if utilization_pct < UNDERUTILIZED_BELOW_PCT {
            Self::Underutilized
        } else {
            Self::Balanced
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Underutilized => "Underutilized",
            Self::Balanced => "Balanced",
            Self::Overloaded => "Overloaded",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeLoad {
    pub employee_id: RecordId,
    pub employee_name: String,
    pub shifts: usize,
    pub planned_hours: f32,
    pub capacity_hours: f32,
    pub utilization_pct: f32,
    pub level: LoadLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkloadOverview {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub employees: Vec<EmployeeLoad>,
    pub overloaded: usize,
    pub underutilized: usize,
}

impl WorkloadOverview {
    /// Planned hours per active employee for the seven days from `week_start`.
    pub fn compute(
        week_start: NaiveDate,
        employees: &[Employee],
        shifts: &[Shift],
        default_capacity_hours: f32,
    ) -> Self {
        let week_end = week_start + Duration::days(6);
        let mut planned: BTreeMap<&RecordId, (usize, f32)> = BTreeMap::new();
        for shift in shifts
            .iter()
            .filter(|shift| shift.shift_date >= week_start && shift.shift_date <= week_end)
        {
            let entry = planned.entry(&shift.employee_id).or_default();
            entry.0 += 1;
            entry.1 += shift.hours();
        }

        let mut loads: Vec<EmployeeLoad> = employees
            .iter()
            .filter(|employee| employee.status != EmploymentStatus::Inactive)
            .map(|employee| {
                let (count, hours) = planned.get(&employee.id).copied().unwrap_or_default();
                let capacity = employee
                    .weekly_hours
                    .filter(|hours| *hours > 0.0)
                    .unwrap_or(default_capacity_hours);
                let utilization_pct = if capacity > 0.0 {
                    hours / capacity * 100.0
                } else {
                    0.0
                };
                EmployeeLoad {
                    employee_id: employee.id.clone(),
                    employee_name: employee.full_name(),
                    shifts: count,
                    planned_hours: hours,
                    capacity_hours: capacity,
                    utilization_pct,
                    level: LoadLevel::classify(utilization_pct),
                }
            })
            .collect();

        loads.sort_by(|left, right| {
            right
                .utilization_pct
                .partial_cmp(&left.utilization_pct)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Self {
            week_start,
            week_end,
            overloaded: loads
                .iter()
                .filter(|load| load.level == LoadLevel::Overloaded)
                .count(),
            underutilized: loads
                .iter()
                .filter(|load| load.level == LoadLevel::Underutilized)
                .count(),
            employees: loads,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AbsenceConflict {
    pub shift_id: RecordId,
    pub absence_id: RecordId,
    pub employee_id: RecordId,
    pub shift_date: NaiveDate,
    pub absence_type: String,
}

/// Shifts that fall on a day covered by an approved absence of the same employee.
pub fn absence_conflicts(shifts: &[Shift], absences: &[Absence]) -> Vec<AbsenceConflict> {
    shifts
        .iter()
        .filter_map(|shift| {
            absences
                .iter()
                .filter(|absence| absence.status == AbsenceStatus::Approved)
                .find(|absence| {
                    absence.employee_id == shift.employee_id && absence.covers(shift.shift_date)
                })
                .map(|absence| AbsenceConflict {
                    shift_id: shift.id.clone(),
                    absence_id: absence.id.clone(),
                    employee_id: shift.employee_id.clone(),
                    shift_date: shift.shift_date,
                    absence_type: absence.absence_type.clone(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, day).expect("valid date")
    }

    fn time(hour: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, 0, 0).expect("valid time")
    }

    fn shift(id: &str, employee: &str, day: u32, start: u32, end: u32) -> Shift {
        Shift {
            id: RecordId(id.to_string()),
            company_id: CompanyId("acme".to_string()),
            employee_id: RecordId(employee.to_string()),
            shift_date: date(day),
            start_time: time(start),
            end_time: time(end),
            role: None,
            location: None,
            status: ShiftStatus::Planned,
        }
    }

    fn employee(id: &str, weekly_hours: Option<f32>, status: EmploymentStatus) -> Employee {
        Employee {
            id: RecordId(id.to_string()),
            company_id: CompanyId("acme".to_string()),
            first_name: "Mia".to_string(),
            last_name: id.to_string(),
            email: format!("{id}@acme.test"),
            position: None,
            department: None,
            employment_type: None,
            status,
            start_date: None,
            weekly_hours,
            created_at: None,
        }
    }

    #[test]
    fn overnight_shifts_wrap_midnight() {
        assert_eq!(shift("s1", "e1", 2, 22, 6).hours(), 8.0);
        assert_eq!(shift("s2", "e1", 2, 9, 17).hours(), 8.0);
    }

    #[test]
    fn shift_times_round_trip_as_hours_and_minutes() {
        let value = serde_json::to_value(shift("s1", "e1", 2, 9, 17)).expect("serializes");
        assert_eq!(value["start_time"], "09:00");
        let parsed: Shift = serde_json::from_value(value).expect("deserializes");
        assert_eq!(parsed.end_time, time(17));
    }

    #[test]
    fn workload_classifies_against_capacity() {
        // 2025-06-02 is a Monday
        let employees = vec![
            employee("e1", None, EmploymentStatus::Active),
            employee("e2", Some(20.0), EmploymentStatus::Active),
            employee("e3", None, EmploymentStatus::Inactive),
        ];
        let mut shifts: Vec<Shift> = (2..=7)
            .map(|day| shift(&format!("a{day}"), "e1", day, 8, 16))
            .collect();
        shifts.push(shift("b1", "e2", 3, 9, 17));
        shifts.push(shift("b2", "e2", 4, 9, 17));
        shifts.push(shift("late", "e2", 9, 9, 17));

        let overview = WorkloadOverview::compute(date(2), &employees, &shifts, 40.0);

        assert_eq!(overview.week_end, date(8));
        assert_eq!(overview.employees.len(), 2);
        let first = &overview.employees[0];
        assert_eq!(first.employee_id.0, "e1");
        assert_eq!(first.planned_hours, 48.0);
        assert_eq!(first.level, LoadLevel::Overloaded);
        let second = &overview.employees[1];
        assert_eq!(second.planned_hours, 16.0);
        assert!((second.utilization_pct - 80.0).abs() < 1e-3);
        assert_eq!(second.level, LoadLevel::Balanced);
        assert_eq!(overview.overloaded, 1);
        assert_eq!(overview.underutilized, 0);
    }

    #[test]
    fn only_approved_absences_conflict() {
        let absence = |id: &str, status| Absence {
            id: RecordId(id.to_string()),
            company_id: CompanyId("acme".to_string()),
            employee_id: RecordId("e1".to_string()),
            start_date: date(3),
            end_date: date(5),
            absence_type: "vacation".to_string(),
            status,
            note: None,
        };
        let shifts = vec![
            shift("s1", "e1", 2, 9, 17),
            shift("s2", "e1", 4, 9, 17),
            shift("s3", "e2", 4, 9, 17),
        ];

        let conflicts = absence_conflicts(
            &shifts,
            &[
                absence("pending", AbsenceStatus::Requested),
                absence("approved", AbsenceStatus::Approved),
            ],
        );

        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].shift_id.0, "s2");
        assert_eq!(conflicts[0].absence_id.0, "approved");
    }
}
