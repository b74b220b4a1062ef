use thiserror::Error;

/// A `schema_callback` failure. Recovered locally: the owning node stays in
/// `Configured` with `cached_schema = None`, and the error is surfaced to the
/// caller of `predict_schema`, not raised as an exception.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("column '{0}' not found in input schema")]
    MissingColumn(String),

    #[error("expected {expected} input schema(s), got {got}")]
    WrongInputCount { expected: usize, got: usize },

    #[error("incompatible types for '{column}': {left} vs {right}")]
    TypeMismatch {
        column: String,
        left: String,
        right: String,
    },

    #[error("upstream schema unavailable")]
    UpstreamUnavailable,

    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}
