use thiserror::Error;

/// Errors produced when checking a submission or a match query.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was absent, empty, or only whitespace.
    /// Carries the field's wire name (e.g. `currentSection`).
    #[error("{0} is required")]
    MissingField(&'static str),
}
