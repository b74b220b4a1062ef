use chrono::{DateTime, Utc};
use flowfile_data::DataHandle;
use flowfile_settings::NodeId;
use std::path::PathBuf;

/// A node's outcome after `execute`. `data_handle` is `None` until the node
/// has actually run (or after a reset clears it).
#[derive(Clone, Debug)]
pub struct NodeResult {
    pub node_id: NodeId,
    pub data_handle: Option<DataHandle>,
    pub example_rows_path: Option<PathBuf>,
    pub error: Option<String>,
    pub row_count: Option<u64>,
}

impl NodeResult {
    pub fn empty(node_id: NodeId) -> Self {
        Self {
            node_id,
            data_handle: None,
            example_rows_path: None,
            error: None,
            row_count: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-node timing and lifecycle bookkeeping, distinct from the cached
/// `DataHandle` itself so `reset()` can clear one without disturbing the
/// other's history (`has_run` is sticky; `has_run_with_current_hash` is
/// not).
#[derive(Clone, Debug, Default)]
pub struct NodeRuntimeStats {
    pub has_run: bool,
    pub has_run_with_current_hash: bool,
    pub is_canceled: bool,
    pub start_ts: Option<DateTime<Utc>>,
    pub end_ts: Option<DateTime<Utc>>,
    pub runtime_ms: Option<u64>,
    pub error: Option<String>,
}

/// Whether this node can cache its own result and whether its transform
/// is expressible as a pure lazy-plan step (vs. one that must collect to
/// operate, e.g. `Pivot`, `Sample`).
#[derive(Clone, Copy, Debug, Default)]
pub struct RuntimeFlags {
    pub cache_results: bool,
    pub streamable: bool,
}

/// One full graph execution's summary, accumulated by the engine and
/// handed back to the caller.
#[derive(Clone, Debug, Default)]
pub struct RunInformation {
    pub flow_id: u64,
    pub start_ts: Option<DateTime<Utc>>,
    pub end_ts: Option<DateTime<Utc>>,
    pub success: bool,
    pub nodes_completed: u32,
    pub total_nodes: u32,
    pub per_node_results: Vec<NodeResult>,
}

impl RunInformation {
    pub fn start(flow_id: u64, total_nodes: u32) -> Self {
        Self {
            flow_id,
            start_ts: Some(Utc::now()),
            end_ts: None,
            success: true,
            nodes_completed: 0,
            total_nodes,
            per_node_results: Vec::new(),
        }
    }

    pub fn record(&mut self, result: NodeResult) {
        if result.is_success() {
            self.nodes_completed += 1;
        } else {
            self.success = false;
        }
        self.per_node_results.push(result);
    }

    /// Records a node the engine chose not to execute (no resolved input on
    /// a kind that requires one). Unlike [`record`](Self::record), this
    /// never flips `success` to `false` and never counts toward
    /// `nodes_completed` — matching the documented "filter node without
    /// input" behavior: the node is excluded from the run, not failed by it.
    pub fn record_skipped(&mut self, result: NodeResult) {
        self.per_node_results.push(result);
    }

    pub fn finish(&mut self) {
        self.end_ts = Some(Utc::now());
    }
}
