use thiserror::Error;

/// A closure/transform failure raised while building or materializing a
/// plan. `flowfile-graph` wraps this into a node-scoped `ExecutionError`
/// with the failing node's id attached.
#[derive(Error, Debug, Clone)]
pub enum TransformError {
    #[error("columnar engine error: {0}")]
    Engine(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("{0}")]
    InvalidInput(String),
}
