use crate::{Operation, TaskId, TaskStatus, WorkerOffloadClient, WorkerError};
use async_trait::async_trait;
use polars::prelude::DataFrame;
use std::path::Path;
use std::time::Duration;

/// Speaks the same contract over HTTP to a separate Worker process, the
/// shape `FLOWFILE_WORKER_URL` selects when it isn't `embedded`. Task state
/// lives on the Worker side; this client only carries the base URL and the
/// per-call poll timeout.
pub struct RemoteWorker {
    base_url: String,
    client: reqwest::Client,
    poll_timeout: Duration,
}

impl RemoteWorker {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
            poll_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }
}

#[async_trait]
impl WorkerOffloadClient for RemoteWorker {
    async fn submit(&self, lazy_plan_bytes: Vec<u8>, file_ref: blake3::Hash, operation: Operation) -> Result<TaskId, WorkerError> {
        #[derive(serde::Serialize)]
        struct SubmitRequest {
            plan: Vec<u8>,
            file_ref: String,
            operation: &'static str,
        }
        #[derive(serde::Deserialize)]
        struct SubmitResponse {
            task_id: TaskId,
        }

        let operation_label = match operation {
            Operation::Collect => "collect",
            Operation::Sink(_) => "sink",
        };

        let resp = self
            .client
            .post(format!("{}/tasks", self.base_url))
            .json(&SubmitRequest {
                plan: lazy_plan_bytes,
                file_ref: file_ref.to_hex().to_string(),
                operation: operation_label,
            })
            .send()
            .await
            .map_err(|e| WorkerError::Transport(e.to_string()))?
            .json::<SubmitResponse>()
            .await
            .map_err(|e| WorkerError::Transport(e.to_string()))?;

        Ok(resp.task_id)
    }

    async fn poll(&self, task: TaskId) -> Result<TaskStatus, WorkerError> {
        let resp = tokio::time::timeout(
            self.poll_timeout,
            self.client.get(format!("{}/tasks/{task}", self.base_url)).send(),
        )
        .await
        .map_err(|_| WorkerError::Timeout(task))?
        .map_err(|e| WorkerError::Transport(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(WorkerError::UnknownTask(task));
        }

        #[derive(serde::Deserialize)]
        #[serde(tag = "state", rename_all = "snake_case")]
        enum WireStatus {
            Queued,
            Running { progress_pct: f32 },
            Completed { artifact_path: String, row_count: u64 },
            Failed { reason: String },
        }

        let wire = resp.json::<WireStatus>().await.map_err(|e| WorkerError::Transport(e.to_string()))?;
        Ok(match wire {
            WireStatus::Queued => TaskStatus::Queued,
            WireStatus::Running { progress_pct } => TaskStatus::Running(progress_pct),
            WireStatus::Completed { artifact_path, row_count } => TaskStatus::Completed {
                artifact_path: artifact_path.into(),
                row_count,
            },
            WireStatus::Failed { reason } => TaskStatus::Failed(reason),
        })
    }

    async fn cancel(&self, task: TaskId) -> Result<(), WorkerError> {
        self.client
            .delete(format!("{}/tasks/{task}", self.base_url))
            .send()
            .await
            .map_err(|e| WorkerError::Transport(e.to_string()))?;
        Ok(())
    }

    async fn read_sample(&self, artifact_path: &Path, max_rows: usize) -> Result<DataFrame, WorkerError> {
        // Artifacts live on the shared cache filesystem; the remote Worker
        // only writes them, the core reads them directly rather than
        // round-tripping rows over HTTP.
        polars::prelude::LazyFrame::scan_parquet(artifact_path, Default::default())
            .map_err(|e| WorkerError::Engine(e.to_string()))?
            .limit(max_rows as u32)
            .collect()
            .map_err(|e| WorkerError::Engine(e.to_string()))
    }
}
