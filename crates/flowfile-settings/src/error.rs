use thiserror::Error;

/// Per-node, non-fatal: settings reference something not satisfied by the
/// current input schema(s). Surfaced for UI display; never blocks graph
/// construction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("column '{0}' referenced by settings does not exist in the input schema")]
    UnknownColumn(String),

    #[error("{kind} requires a {port} input")]
    MissingRequiredInput { kind: &'static str, port: &'static str },

    #[error("invalid settings for {kind}: {reason}")]
    InvalidPayload { kind: &'static str, reason: String },
}
