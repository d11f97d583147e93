use thiserror::Error;

pub type Result<T> = std::result::Result<T, LessonError>;

/// Failures parsing a whole model response.
///
/// Individual events and steps never fail: they are normalized, dropped, or
/// repaired. Only a response with no usable structure at all is an error.
#[derive(Debug, Error)]
pub enum LessonError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("response contained no valid steps")]
    NoValidSteps,

    #[error("expected a JSON object for {what}")]
    NotAnObject { what: &'static str },
}

impl LessonError {
    #[must_use]
    pub fn missing(field: &'static str) -> Self {
        Self::MissingField { field }
    }
}
