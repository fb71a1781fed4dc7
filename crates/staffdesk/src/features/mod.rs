//! Feature modules. Each binds record and form types to a table and adds the
//! figures its dashboard derives from the fetched rows.

pub mod ai_governance;
pub mod calendar;
pub mod cards;
pub mod employees;
pub mod expenses;
pub mod organization;
pub mod projects;
pub mod shifts;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

/// Parses `YYYY-MM-DD` input from forms, CSV exports and the command line.
pub fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// Form date inputs submit an empty string when left blank.
pub(crate) fn blank_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_date(value).map(Some).map_err(serde::de::Error::custom),
    }
}
