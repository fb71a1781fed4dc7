use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::entity::{CompanyId, Draft, Entity, RecordId};
use crate::data::store::Direction;
use crate::views::form::RequiredFields;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: RecordId,
    pub company_id: CompanyId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub starts_at: DateTime<Utc>,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub employee_id: Option<RecordId>,
    #[serde(default)]
    pub location: Option<String>,
}

impl CalendarEvent {
    /// Events without an end are treated as instantaneous.
    pub fn end(&self) -> DateTime<Utc> {
        self.ends_at.unwrap_or(self.starts_at).max(self.starts_at)
    }

    pub fn overlaps(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
        self.starts_at <= to && self.end() >= from
    }
}

impl Entity for CalendarEvent {
    const TABLE: &'static str = "calendar_events";
    const LABEL: &'static str = "calendar events";
    const ORDER_BY: (&'static str, Direction) = ("starts_at", Direction::Ascending);

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.title.as_str()];
        fields.extend(self.description.as_deref());
        fields.extend(self.event_type.as_deref());
        fields.extend(self.location.as_deref());
        fields
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarEventDraft {
    pub title: Option<String>,
    pub description: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub event_type: Option<String>,
    pub employee_id: Option<RecordId>,
    pub location: Option<String>,
}

impl Draft for CalendarEventDraft {
    type Record = CalendarEvent;

    fn required(&self) -> RequiredFields {
        RequiredFields::new()
            .text("title", self.title.as_deref())
            .present("starts_at", &self.starts_at)
    }
}

/// Events touching `[from, to]`, earliest first.
pub fn agenda(
    events: &[CalendarEvent],
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Vec<CalendarEvent> {
    let mut selected: Vec<CalendarEvent> = events
        .iter()
        .filter(|event| event.overlaps(from, to))
        .cloned()
        .collect();
    selected.sort_by(|left, right| {
        left.starts_at
            .cmp(&right.starts_at)
            .then_with(|| left.title.cmp(&right.title))
    });
    selected
}
