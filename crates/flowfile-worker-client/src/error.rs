use thiserror::Error;

/// Offload failure. The execution engine retries once with a fresh task id;
/// a second failure is surfaced to the node as its `ExecutionError`.
#[derive(Error, Debug, Clone)]
pub enum WorkerError {
    #[error("worker task {0} not found")]
    UnknownTask(u64),

    #[error("columnar engine error: {0}")]
    Engine(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("worker request failed: {0}")]
    Transport(String),

    #[error("worker task {0} timed out")]
    Timeout(u64),

    #[error("worker task {0} canceled")]
    Canceled(u64),
}
