//! # Worker Offload Client
//!
//! The contract the execution engine uses to push heavy materializations
//! outside the core's own process: `submit` a lazy plan, `poll` its status,
//! `read_sample` a prefix of the finished artifact, `cancel` if abandoned.
//! `embedded` runs the same contract in process (for tests and the
//! `embedded` worker URL); `remote` speaks it over HTTP to a separate
//! Worker process.

pub mod cache;
mod embedded;
mod error;
mod remote;

pub use cache::ArtifactCache;
pub use embedded::EmbeddedWorker;
pub use error::WorkerError;
pub use remote::RemoteWorker;

use async_trait::async_trait;
use flowfile_settings::FileFormat;
use polars::prelude::{DataFrame, LazyFrame};
use std::path::PathBuf;

pub type TaskId = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Collect,
    Sink(FileFormat),
}

#[derive(Clone, Debug, PartialEq)]
pub enum TaskStatus {
    Queued,
    Running(f32),
    Completed { artifact_path: PathBuf, row_count: u64 },
    Failed(String),
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed { .. } | TaskStatus::Failed(_))
    }
}

/// The Worker Offload Client contract. `file_ref` is always the requesting
/// node's content hash: a `submit` whose `file_ref` is already cached
/// short-circuits straight to `Completed` without re-running the plan.
#[async_trait]
pub trait WorkerOffloadClient: Send + Sync {
    /// Turns a lazy plan into the opaque byte string `submit` expects — the
    /// core never interprets these bytes, only whatever Worker receives
    /// them does. The default encodes the plan's explain text, which is
    /// enough for a [`RemoteWorker`] that has no local state to keep a
    /// `LazyFrame` alive in; [`EmbeddedWorker`] overrides this since, with
    /// no process boundary to cross, it can just stash the real plan and
    /// hand back a lookup key.
    fn prepare_plan(&self, plan: &LazyFrame) -> Vec<u8> {
        plan.describe_plan().unwrap_or_default().into_bytes()
    }

    /// Non-blocking: enqueues the plan for materialization and returns
    /// immediately with a task handle.
    async fn submit(&self, lazy_plan_bytes: Vec<u8>, file_ref: blake3::Hash, operation: Operation) -> Result<TaskId, WorkerError>;

    async fn poll(&self, task: TaskId) -> Result<TaskStatus, WorkerError>;

    /// Best-effort termination; a task already `Completed`/`Failed` is a
    /// no-op.
    async fn cancel(&self, task: TaskId) -> Result<(), WorkerError>;

    /// Streams up to `max_rows` from an already-materialized artifact.
    async fn read_sample(&self, artifact_path: &std::path::Path, max_rows: usize) -> Result<DataFrame, WorkerError>;
}
