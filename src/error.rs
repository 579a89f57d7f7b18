use thiserror::Error;

/// Fatal, run-level errors. Anything field-local lives in [`FieldError`] and
/// is folded into the run report instead of propagating.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    #[error("Document is stale or detached: {0}")]
    StaleDocument(String),

    #[error("Browser launch failed: {0}")]
    LaunchError(String),

    #[error("Navigation failed: {0}")]
    NavigationError(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("JavaScript error: {0}")]
    JsError(String),

    #[error("CDP error: {0}")]
    CdpError(#[from] chromiumoxide::error::CdpError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Errors scoped to a single fill-plan entry. The executor catches these at
/// its boundary and records them as per-field outcomes; they never abort the
/// run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
    #[error("value cannot be coerced to {kind}: {reason}")]
    IncoercibleValue { kind: String, reason: String },

    #[error("no date format could be inferred for the target field")]
    UnknownDateFormat,

    #[error("no option matched the value (best score {best:.2})")]
    NoMatchingOption { best: f32 },

    #[error("timed out waiting for the element to become interactable")]
    Timeout,

    #[error("element interaction failed: {0}")]
    Element(String),
}

impl serde::Serialize for FieldError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
