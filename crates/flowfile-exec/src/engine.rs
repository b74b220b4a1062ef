//! Schedulers for the two execution modes. Both share the same node-level
//! primitives (`resolve_inputs`, `materialize`) and differ only in which
//! nodes they visit and what they do once a node has run.

use crate::config::EngineConfig;
use crate::error::EngineError;
use flowfile_data::DataHandle;
use flowfile_graph::{ExecutionLocation, ExecutionMode, FlowGraph, NodeResult, RunInformation};
use flowfile_settings::{FileFormat, NodeId, NodeKind, Port};
use flowfile_worker_client::{Operation, TaskStatus, WorkerOffloadClient};
use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Drives a `FlowGraph` through one full run, dispatching to the scheduler
/// the flow's own `ExecutionMode` selects. Owns no graph state itself — a
/// single engine instance can run any number of flows, sequentially, one
/// at a time per flow (the caller is responsible for not calling `run`
/// concurrently on the same `FlowGraph`; the flow's own `is_running` flag
/// makes a second concurrent attempt fail fast rather than corrupt state).
pub struct ExecutionEngine {
    worker: Arc<dyn WorkerOffloadClient>,
    config: EngineConfig,
}

impl ExecutionEngine {
    pub fn new(worker: Arc<dyn WorkerOffloadClient>, config: EngineConfig) -> Self {
        Self { worker, config }
    }

    /// Runs every node reachable from the flow's start nodes. `requested`
    /// names additional sinks the caller wants materialized in Performance
    /// mode even if nothing downstream of them needs it (e.g. a UI asking
    /// to preview an intermediate node) — Development mode ignores it,
    /// since every reachable node is already a "sink" there.
    pub async fn run(&self, graph: &mut FlowGraph, requested: &[NodeId]) -> Result<RunInformation, EngineError> {
        if graph.settings.is_running {
            return Err(EngineError::AlreadyRunning(graph.flow_id));
        }
        graph.settings.is_running = true;
        graph.settings.is_canceled = false;
        graph.predict_all_schemas();

        let info = match graph.settings.execution_mode {
            ExecutionMode::Development => self.run_development(graph).await,
            ExecutionMode::Performance => self.run_performance(graph, requested).await,
        };

        graph.settings.is_running = false;
        Ok(info)
    }

    pub fn cancel(&self, graph: &mut FlowGraph) {
        graph.cancel();
    }

    // --- Development mode: push, per-node materialization ---

    async fn run_development(&self, graph: &mut FlowGraph) -> RunInformation {
        let order = graph.topological_order();
        let mut info = RunInformation::start(graph.flow_id, graph.len() as u32);
        let mut upstream_failed: HashSet<NodeId> = HashSet::new();
        let mut canceled = false;

        for skipped_id in unreachable_node_ids(graph, &order) {
            info.record_skipped(NodeResult {
                node_id: skipped_id,
                data_handle: None,
                example_rows_path: None,
                error: Some("skipped, has no input".to_string()),
                row_count: None,
            });
        }

        for node_id in order {
            if graph.settings.is_canceled {
                canceled = true;
                break;
            }

            let parent_ids: Vec<NodeId> = graph
                .node(node_id)
                .map(|n| n.settings().depends_on().parent_refs().into_iter().map(|(id, _)| id).collect())
                .unwrap_or_default();
            if parent_ids.iter().any(|p| upstream_failed.contains(p)) {
                upstream_failed.insert(node_id);
                info.record(NodeResult {
                    node_id,
                    data_handle: None,
                    example_rows_path: None,
                    error: Some("upstream failed".to_string()),
                    row_count: None,
                });
                continue;
            }

            let (inputs, resolved_ports) = resolve_inputs(graph, node_id);
            let Some(node) = graph.node(node_id) else { continue };
            if !node.has_required_inputs(&resolved_ports) {
                info.record_skipped(NodeResult {
                    node_id,
                    data_handle: None,
                    example_rows_path: None,
                    error: Some("skipped, has no input".to_string()),
                    row_count: None,
                });
                continue;
            }

            // Spec choice: an unchanged hash means the prior artifact is
            // re-exposed rather than recomputed, so re-running twice in a
            // row executes zero closures the second time.
            if node.stats().has_run_with_current_hash {
                if let Some(prev) = node.result().cloned() {
                    info.record(prev);
                }
                continue;
            }

            let node_hash = node.hash();
            let node = graph.node_mut(node_id).expect("checked above");
            let result = node.execute(&inputs).clone();
            if result.error.is_some() {
                upstream_failed.insert(node_id);
                info.record(result);
                continue;
            }

            let materialized = self
                .materialize(graph, graph.flow_id, node_hash, result, graph.settings.execution_location, true)
                .await;
            if materialized.error.is_some() {
                upstream_failed.insert(node_id);
            }
            if let Some(node) = graph.node_mut(node_id) {
                node.set_result(materialized.clone());
            }
            info.record(materialized);
        }

        if canceled {
            // Cooperative cancellation: the next suspension point observed
            // the flag and stopped scheduling further nodes, so the run is
            // reported as unsuccessful even though every node that did run
            // may itself have succeeded.
            info.success = false;
        }
        info.finish();
        info
    }

    // --- Performance mode: pull from sinks, one fused plan per path ---

    async fn run_performance(&self, graph: &mut FlowGraph, requested: &[NodeId]) -> RunInformation {
        let order = graph.topological_order();
        let sinks = self.collect_sinks(graph, &order, requested);
        let mut info = RunInformation::start(graph.flow_id, graph.len() as u32);
        let mut executed: HashSet<NodeId> = HashSet::new();
        let mut aborted = false;
        let mut canceled = false;

        for skipped_id in unreachable_node_ids(graph, &order) {
            info.record_skipped(NodeResult {
                node_id: skipped_id,
                data_handle: None,
                example_rows_path: None,
                error: Some("skipped, has no input".to_string()),
                row_count: None,
            });
        }

        'sinks: for &sink_id in &sinks {
            if graph.settings.is_canceled {
                canceled = true;
                break;
            }
            let ancestry = ancestors_inclusive(graph, sink_id);
            let path: Vec<NodeId> = order.iter().copied().filter(|id| ancestry.contains(id)).collect();

            for node_id in path {
                if graph.settings.is_canceled {
                    canceled = true;
                    break 'sinks;
                }
                if executed.contains(&node_id) {
                    continue;
                }

                let (inputs, resolved_ports) = resolve_inputs(graph, node_id);
                let Some(node) = graph.node(node_id) else { continue };
                if !node.has_required_inputs(&resolved_ports) {
                    info.record_skipped(NodeResult {
                        node_id,
                        data_handle: None,
                        example_rows_path: None,
                        error: Some("skipped, has no input".to_string()),
                        row_count: None,
                    });
                    executed.insert(node_id);
                    continue;
                }

                let node_hash = node.hash();
                let force_materialize = node.runtime_flags().cache_results;
                let node = graph.node_mut(node_id).expect("checked above");
                let mut result = node.execute(&inputs).clone();

                let is_sink = node_id == sink_id;
                if result.error.is_none() && (is_sink || force_materialize) {
                    result = self
                        .materialize(graph, graph.flow_id, node_hash, result, graph.settings.execution_location, false)
                        .await;
                    if let Some(node) = graph.node_mut(node_id) {
                        node.set_result(result.clone());
                    }
                }

                let failed = result.error.is_some();
                executed.insert(node_id);
                info.record(result);

                if failed && is_sink {
                    // Performance mode aborts the run at the first error
                    // along the path to a sink — the sink and whichever of
                    // its remaining ancestors errored are already recorded.
                    aborted = true;
                    break 'sinks;
                }
            }
        }

        if aborted || canceled {
            info.success = false;
        }
        info.finish();
        info
    }

    /// Which nodes act as sinks this run: output-writing kinds,
    /// `cache_results = true` nodes, and anything the caller explicitly
    /// named. If none of those apply, falls back to the reachable graph's
    /// terminal nodes (those with no children in the executed order) so a
    /// pull-mode run over a plain transform chain still produces output.
    fn collect_sinks(&self, graph: &FlowGraph, order: &[NodeId], requested: &[NodeId]) -> Vec<NodeId> {
        let order_set: HashSet<NodeId> = order.iter().copied().collect();
        let mut sinks: Vec<NodeId> = order
            .iter()
            .copied()
            .filter(|&id| {
                requested.contains(&id)
                    || graph.node(id).map_or(false, |n| n.settings().common().cache_results)
                    || graph.node(id).map_or(false, |n| {
                        matches!(n.kind(), NodeKind::Output | NodeKind::DatabaseWriter | NodeKind::CloudStorageWriter)
                    })
            })
            .collect();

        if sinks.is_empty() {
            let has_child: HashSet<NodeId> = order
                .iter()
                .flat_map(|&id| {
                    graph
                        .node(id)
                        .map(|n| n.settings().depends_on().parent_refs().into_iter().map(|(p, _)| p).collect::<Vec<_>>())
                        .unwrap_or_default()
                })
                .filter(|id| order_set.contains(id))
                .collect();
            sinks = order.iter().copied().filter(|id| !has_child.contains(id)).collect();
        }
        sinks
    }

    /// Realizes a node's in-memory-or-lazy result into whichever form
    /// `ExecutionLocation` calls for: `Local` collects in process, `Remote`
    /// offloads to the Worker. On success the returned `NodeResult` carries
    /// the materialized `DataHandle`; Development-mode callers additionally
    /// get `example_rows_path` populated.
    async fn materialize(
        &self,
        graph: &FlowGraph,
        flow_id: u64,
        node_hash: blake3::Hash,
        result: NodeResult,
        location: ExecutionLocation,
        take_sample: bool,
    ) -> NodeResult {
        let node_id = result.node_id;
        let Some(handle) = result.data_handle else { return result };

        match location {
            ExecutionLocation::Local => self.materialize_local(flow_id, node_id, handle, node_hash, take_sample).await,
            ExecutionLocation::Remote => self.materialize_remote(graph, flow_id, node_id, handle, node_hash, take_sample).await,
        }
    }

    async fn materialize_local(
        &self,
        flow_id: u64,
        node_id: NodeId,
        handle: DataHandle,
        node_hash: blake3::Hash,
        take_sample: bool,
    ) -> NodeResult {
        let df = match handle.collect() {
            Ok(df) => df,
            Err(e) => return failed_result(node_id, e.to_string()),
        };
        let row_count = df.height() as u64;
        let schema = handle.schema().clone();
        let in_memory = DataHandle::from_dataframe(df.clone(), schema);

        let example_rows_path = if take_sample {
            self.write_sample_file(flow_id, node_hash, &df.head(Some(self.config.sample_rows))).ok()
        } else {
            None
        };

        NodeResult {
            node_id,
            data_handle: Some(in_memory),
            example_rows_path,
            error: None,
            row_count: Some(row_count),
        }
    }

    async fn materialize_remote(
        &self,
        graph: &FlowGraph,
        flow_id: u64,
        node_id: NodeId,
        handle: DataHandle,
        node_hash: blake3::Hash,
        take_sample: bool,
    ) -> NodeResult {
        let plan = handle.lazy();
        let submit_once = || async {
            let bytes = self.worker.prepare_plan(&plan);
            let task = self.worker.submit(bytes, node_hash, Operation::Sink(FileFormat::Parquet)).await?;
            self.await_completion(graph, task).await
        };

        let outcome = match submit_once().await {
            Ok(v) => Ok(v),
            Err(first_err) => {
                if graph.settings.is_canceled {
                    Err(first_err)
                } else {
                    tracing::warn!(node_id, error = %first_err, "worker offload failed, retrying once");
                    submit_once().await.map_err(|_| first_err)
                }
            }
        };

        let (artifact_path, row_count) = match outcome {
            Ok(v) => v,
            Err(e) => return failed_result(node_id, e.to_string()),
        };

        let on_disk = match DataHandle::from_on_disk(artifact_path.clone(), node_hash, handle.schema().clone()) {
            Ok(h) => h,
            Err(e) => return failed_result(node_id, e.to_string()),
        };

        let example_rows_path = if take_sample {
            self.sample_remote(flow_id, node_hash, &artifact_path).await.ok()
        } else {
            None
        };

        NodeResult {
            node_id,
            data_handle: Some(on_disk),
            example_rows_path,
            error: None,
            row_count: Some(row_count),
        }
    }

    async fn sample_remote(&self, flow_id: u64, node_hash: blake3::Hash, artifact_path: &std::path::Path) -> Result<PathBuf, flowfile_worker_client::WorkerError> {
        let sample_df = self.worker.read_sample(artifact_path, self.config.sample_rows).await?;
        self.write_sample_file(flow_id, node_hash, &sample_df)
            .map_err(|e| flowfile_worker_client::WorkerError::Io(e.to_string()))
    }

    fn write_sample_file(&self, flow_id: u64, node_hash: blake3::Hash, df: &polars::prelude::DataFrame) -> std::io::Result<PathBuf> {
        let dir = self.config.cache_root.join(flow_id.to_string());
        std::fs::create_dir_all(&dir)?;
        let final_path = dir.join(format!("{}_sample.parquet", node_hash.to_hex()));
        let tmp_path = final_path.with_extension("parquet.tmp");
        let file = std::fs::File::create(&tmp_path)?;
        let mut df = df.clone();
        polars::prelude::ParquetWriter::new(file)
            .finish(&mut df)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
        std::fs::rename(&tmp_path, &final_path)?;
        Ok(final_path)
    }

    /// Polls until the task reaches a terminal state, the per-call poll
    /// timeout trips, the overall task timeout elapses, or the flow is
    /// canceled — in the last case the in-flight task is told to cancel
    /// too, per the "partial materializations are not kept" rule.
    async fn await_completion(&self, graph: &FlowGraph, task: flowfile_worker_client::TaskId) -> Result<(PathBuf, u64), flowfile_worker_client::WorkerError> {
        let deadline = Instant::now() + self.config.task_timeout;
        loop {
            if graph.settings.is_canceled {
                let _ = self.worker.cancel(task).await;
                return Err(flowfile_worker_client::WorkerError::Canceled(task));
            }
            if Instant::now() >= deadline {
                let _ = self.worker.cancel(task).await;
                return Err(flowfile_worker_client::WorkerError::Timeout(task));
            }
            let status = tokio::time::timeout(self.config.poll_timeout, self.worker.poll(task))
                .await
                .map_err(|_| flowfile_worker_client::WorkerError::Timeout(task))??;
            match status {
                TaskStatus::Completed { artifact_path, row_count } => return Ok((artifact_path, row_count)),
                TaskStatus::Failed(reason) => return Err(flowfile_worker_client::WorkerError::Transport(reason)),
                TaskStatus::Queued | TaskStatus::Running(_) => {
                    tokio::time::sleep(self.config.poll_interval).await;
                }
            }
        }
    }
}

fn failed_result(node_id: NodeId, error: String) -> NodeResult {
    NodeResult {
        node_id,
        data_handle: None,
        example_rows_path: None,
        error: Some(error),
        row_count: None,
    }
}

fn resolve_inputs(graph: &FlowGraph, node_id: NodeId) -> (Vec<DataHandle>, Vec<Port>) {
    let Some(node) = graph.node(node_id) else {
        return (Vec::new(), Vec::new());
    };
    let mut handles = Vec::new();
    let mut ports = Vec::new();
    for (parent_id, port) in node.settings().depends_on().parent_refs() {
        if let Some(parent) = graph.node(parent_id) {
            if let Some(result) = parent.result() {
                if let Some(handle) = &result.data_handle {
                    handles.push(handle.clone());
                    ports.push(port);
                }
            }
        }
    }
    (handles, ports)
}

/// Nodes `topological_order` never visits because they aren't reachable
/// from any start node — e.g. a node that requires input but whose parent
/// connection was never made or was deleted. These are never scheduled,
/// so without this they'd be silently missing from `per_node_results`
/// instead of showing up as "skipped, has no input" like a reachable node
/// with an unresolved port does.
fn unreachable_node_ids(graph: &FlowGraph, order: &[NodeId]) -> Vec<NodeId> {
    let in_order: HashSet<NodeId> = order.iter().copied().collect();
    let mut missing: Vec<NodeId> = graph.node_ids().filter(|id| !in_order.contains(id)).collect();
    missing.sort_unstable();
    missing
}

fn ancestors_inclusive(graph: &FlowGraph, node_id: NodeId) -> HashSet<NodeId> {
    let mut seen = HashSet::new();
    let mut queue = VecDeque::new();
    seen.insert(node_id);
    queue.push_back(node_id);
    while let Some(cur) = queue.pop_front() {
        let Some(node) = graph.node(cur) else { continue };
        for (parent_id, _) in node.settings().depends_on().parent_refs() {
            if seen.insert(parent_id) {
                queue.push_back(parent_id);
            }
        }
    }
    seen
}
