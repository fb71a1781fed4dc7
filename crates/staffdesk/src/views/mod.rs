pub mod form;
pub mod list;

pub use form::{Notice, NoticeSeverity, RequiredFields, SubmitOutcome};
pub use list::{empty_message, ListFilter, ListState, ListView};
