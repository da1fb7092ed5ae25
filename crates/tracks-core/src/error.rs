use thiserror::Error;

/// Errors that abort a pipeline run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// A field needed for partitioning or ordering was null or empty.
    #[error("{stage}: required field `{field}` is missing on line {line}")]
    MissingField {
        stage: &'static str,
        field: &'static str,
        line: usize,
    },
}
