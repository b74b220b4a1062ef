use crate::{ArtifactCache, Operation, TaskId, TaskStatus, WorkerOffloadClient, WorkerError};
use async_trait::async_trait;
use dashmap::DashMap;
use flowfile_settings::FileFormat;
use polars::prelude::{IntoLazy, LazyFrame, ScanArgsParquet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// The in-process Worker: no separate OS process, no real network hop. A
/// plan handed to `submit` is registered locally via [`EmbeddedWorker::register_plan`]
/// (there is no process boundary to cross, so "serialization" degenerates to
/// a local handle rather than a real byte-for-byte plan encoding) and
/// materialized synchronously, so every task is `Completed` the instant
/// `submit` returns; `poll` never observes `Queued`/`Running`.
pub struct EmbeddedWorker {
    cache_root: PathBuf,
    cache: ArtifactCache,
    plans: Arc<DashMap<u64, LazyFrame>>,
    tasks: Arc<DashMap<TaskId, TaskStatus>>,
    next_plan_handle: Arc<AtomicU64>,
    next_task_id: Arc<AtomicU64>,
}

impl EmbeddedWorker {
    pub fn new(cache_root: PathBuf, cache_byte_budget: u64) -> Self {
        let _ = std::fs::create_dir_all(&cache_root);
        Self {
            cache_root,
            cache: ArtifactCache::new(cache_byte_budget),
            plans: Arc::new(DashMap::new()),
            tasks: Arc::new(DashMap::new()),
            next_plan_handle: Arc::new(AtomicU64::new(0)),
            next_task_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Registers a plan for a later `submit` call and returns the opaque
    /// handle bytes `submit` expects. Exists because `WorkerOffloadClient`'s
    /// contract is phrased in terms of a re-hydratable byte string; in
    /// process, there is nothing to re-hydrate, so the bytes are just a
    /// lookup key into this worker's own plan registry.
    pub fn register_plan(&self, plan: LazyFrame) -> Vec<u8> {
        let handle = self.next_plan_handle.fetch_add(1, Ordering::Relaxed);
        self.plans.insert(handle, plan);
        handle.to_le_bytes().to_vec()
    }

    fn artifact_path(&self, file_ref: blake3::Hash, ext: &str) -> PathBuf {
        self.cache_root.join(format!("{}.{}", file_ref.to_hex(), ext))
    }

    fn decode_handle(bytes: &[u8]) -> Result<u64, WorkerError> {
        let arr: [u8; 8] = bytes
            .try_into()
            .map_err(|_| WorkerError::Transport("malformed embedded plan handle".into()))?;
        Ok(u64::from_le_bytes(arr))
    }
}

#[async_trait]
impl WorkerOffloadClient for EmbeddedWorker {
    fn prepare_plan(&self, plan: &LazyFrame) -> Vec<u8> {
        self.register_plan(plan.clone())
    }

    async fn submit(&self, lazy_plan_bytes: Vec<u8>, file_ref: blake3::Hash, operation: Operation) -> Result<TaskId, WorkerError> {
        let ext = match operation {
            Operation::Collect | Operation::Sink(FileFormat::Parquet) => "parquet",
            Operation::Sink(FileFormat::Csv) => "csv",
            Operation::Sink(FileFormat::Json) => "json",
            Operation::Sink(FileFormat::Ipc) => "ipc",
        };
        let artifact_path = self.artifact_path(file_ref, ext);
        let task_id = self.next_task_id.fetch_add(1, Ordering::Relaxed);

        if let Some(cached) = self.cache.get(&file_ref) {
            let row_count = row_count_of(&cached)?;
            self.tasks.insert(
                task_id,
                TaskStatus::Completed {
                    artifact_path: cached,
                    row_count,
                },
            );
            return Ok(task_id);
        }

        let handle = Self::decode_handle(&lazy_plan_bytes)?;
        let plan = self
            .plans
            .remove(&handle)
            .map(|(_, plan)| plan)
            .ok_or_else(|| WorkerError::Transport("unknown embedded plan handle".into()))?;

        let status = match materialize(plan, &artifact_path) {
            Ok(row_count) => {
                if let Ok(meta) = std::fs::metadata(&artifact_path) {
                    self.cache.insert(file_ref, artifact_path.clone(), meta.len());
                }
                TaskStatus::Completed { artifact_path, row_count }
            }
            Err(e) => TaskStatus::Failed(e.to_string()),
        };
        self.tasks.insert(task_id, status);
        Ok(task_id)
    }

    async fn poll(&self, task: TaskId) -> Result<TaskStatus, WorkerError> {
        self.tasks.get(&task).map(|s| s.clone()).ok_or(WorkerError::UnknownTask(task))
    }

    async fn cancel(&self, task: TaskId) -> Result<(), WorkerError> {
        if let Some(mut entry) = self.tasks.get_mut(&task) {
            if !entry.is_terminal() {
                *entry = TaskStatus::Failed("canceled".to_string());
            }
        }
        Ok(())
    }

    async fn read_sample(&self, artifact_path: &Path, max_rows: usize) -> Result<polars::prelude::DataFrame, WorkerError> {
        LazyFrame::scan_parquet(artifact_path, ScanArgsParquet::default())
            .map_err(|e| WorkerError::Engine(e.to_string()))?
            .limit(max_rows as u32)
            .collect()
            .map_err(|e| WorkerError::Engine(e.to_string()))
    }
}

fn materialize(plan: LazyFrame, artifact_path: &Path) -> Result<u64, WorkerError> {
    let tmp_path = artifact_path.with_extension("tmp");
    let mut df = plan.collect().map_err(|e| WorkerError::Engine(e.to_string()))?;
    let row_count = df.height() as u64;

    let file = std::fs::File::create(&tmp_path).map_err(|e| WorkerError::Io(e.to_string()))?;
    polars::prelude::ParquetWriter::new(file)
        .finish(&mut df)
        .map_err(|e| WorkerError::Engine(e.to_string()))?;
    std::fs::rename(&tmp_path, artifact_path).map_err(|e| WorkerError::Io(e.to_string()))?;
    Ok(row_count)
}

fn row_count_of(path: &Path) -> Result<u64, WorkerError> {
    let df = LazyFrame::scan_parquet(path, ScanArgsParquet::default())
        .map_err(|e| WorkerError::Engine(e.to_string()))?
        .collect()
        .map_err(|e| WorkerError::Engine(e.to_string()))?;
    Ok(df.height() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    #[tokio::test]
    async fn submit_materializes_and_caches() {
        let dir = tempfile::tempdir().unwrap();
        let worker = EmbeddedWorker::new(dir.path().to_path_buf(), 10_000_000);

        let df = df!["a" => [1i64, 2, 3]].unwrap();
        let plan = df.lazy();
        let handle = worker.register_plan(plan);
        let file_ref = blake3::hash(b"node-1");

        let task = worker.submit(handle, file_ref, Operation::Collect).await.unwrap();
        let status = worker.poll(task).await.unwrap();
        match status {
            TaskStatus::Completed { row_count, .. } => assert_eq!(row_count, 3),
            other => panic!("expected Completed, got {other:?}"),
        }
        assert!(worker.cache.contains(&file_ref));
    }

    #[tokio::test]
    async fn resubmitting_same_file_ref_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let worker = EmbeddedWorker::new(dir.path().to_path_buf(), 10_000_000);
        let file_ref = blake3::hash(b"node-1");

        let plan = df!["a" => [1i64]].unwrap().lazy();
        let handle = worker.register_plan(plan);
        worker.submit(handle, file_ref, Operation::Collect).await.unwrap();

        // No plan registered this time; a cache hit must not need one.
        let second = worker.submit(Vec::new(), file_ref, Operation::Collect).await.unwrap();
        assert!(matches!(worker.poll(second).await.unwrap(), TaskStatus::Completed { .. }));
    }
}
