use serde::Serialize;

use crate::data::entity::Draft;
use crate::data::store::StoreError;

/// Shallow presence check run before a form is allowed to write.
#[derive(Debug, Clone, Default)]
pub struct RequiredFields {
    checks: Vec<(&'static str, bool)>,
}

impl RequiredFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text inputs count as filled when they hold non-whitespace characters.
    pub fn text(mut self, field: &'static str, value: Option<&str>) -> Self {
        let filled = value.is_some_and(|value| !value.trim().is_empty());
        self.checks.push((field, filled));
        self
    }

    pub fn number(mut self, field: &'static str, value: Option<f64>) -> Self {
        self.checks.push((field, value.is_some_and(f64::is_finite)));
        self
    }

    pub fn present<T>(mut self, field: &'static str, value: &Option<T>) -> Self {
        self.checks.push((field, value.is_some()));
        self
    }

    /// Missing fields in declaration order.
    pub fn missing(&self) -> Vec<&'static str> {
        self.checks
            .iter()
            .filter(|(_, filled)| !filled)
            .map(|(field, _)| *field)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.checks.iter().all(|(_, filled)| *filled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeSeverity {
    Success,
    Validation,
    Error,
}

/// Toast shown to the user after a form action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub severity: NoticeSeverity,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            severity: NoticeSeverity::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: NoticeSeverity::Error,
            message: message.into(),
        }
    }

    pub fn missing_fields(missing: &[&'static str]) -> Self {
        Self {
            severity: NoticeSeverity::Validation,
            message: format!(
                "Please fill in all required fields: {}",
                missing.join(", ")
            ),
        }
    }
}

/// Result of submitting a create dialog.
///
/// Rejected submissions hand the draft back so the user can correct and retry.
#[derive(Debug)]
pub enum SubmitOutcome<D: Draft> {
    Created {
        record: D::Record,
        notice: Notice,
    },
    Invalid {
        draft: D,
        missing: Vec<&'static str>,
        notice: Notice,
    },
    Failed {
        draft: D,
        error: StoreError,
        notice: Notice,
    },
}

impl<D: Draft> SubmitOutcome<D> {
    pub fn notice(&self) -> &Notice {
        match self {
            Self::Created { notice, .. }
            | Self::Invalid { notice, .. }
            | Self::Failed { notice, .. } => notice,
        }
    }

    pub fn record(&self) -> Option<&D::Record> {
        match self {
            Self::Created { record, .. } => Some(record),
            _ => None,
        }
    }

    pub fn into_record(self) -> Option<D::Record> {
        match self {
            Self::Created { record, .. } => Some(record),
            _ => None,
        }
    }
}
