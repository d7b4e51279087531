use thiserror::Error;

/// Domain-specific errors for the schedule engine
#[derive(Error, Debug)]
pub enum SchedulerError {
    // Input/Parse errors
    #[error("Failed to read file '{path}': {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse JSON in '{file}': {message}")]
    JsonParse { file: String, message: String },

    // Calendar errors
    #[error("Invalid interval: start {start} is not before end {end}")]
    InvalidInterval { start: String, end: String },

    #[error("Invalid time of day: '{0}'")]
    InvalidTime(String),

    // Data validation errors
    #[error("{kind} '{id}' not found in snapshot")]
    NotFound { kind: &'static str, id: String },

    #[error("Duplicate ID found: {id_type} '{id}'")]
    DuplicateId { id_type: String, id: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Course '{course_id}' has no qualified teachers")]
    NoQualifiedTeacher { course_id: String },

    // Resolver errors
    #[error("Suggestion rejected: {0}")]
    SuggestionRejected(String),
}

/// Use anyhow::Result at application boundaries
pub type Result<T> = anyhow::Result<T>;
