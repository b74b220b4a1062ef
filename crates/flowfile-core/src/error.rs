use flowfile_graph::GraphIntegrityError;
use thiserror::Error;

/// Everything the facade's own operations can fail with, layered over the
/// lower crates' typed errors rather than re-describing them.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid flow document: {0}")]
    Format(String),

    #[error("flow document references an invalid topology: {0}")]
    Topology(#[from] GraphIntegrityError),
}
