//! # flowfile-core
//!
//! The facade a host application or the bundled CLI builds on: resolves
//! `FLOWFILE_*` configuration, wires up the Worker Offload Client the
//! configuration names, and exposes a single [`Flowfile`] handle that runs
//! and persists `FlowGraph`s without the caller having to assemble the
//! lower crates itself.

mod config;
mod error;
mod persistence;

pub use config::{FlowfileConfig, WorkerEndpoint};
pub use error::PersistenceError;
pub use persistence::{load_graph, save_graph, FlowDocument};

use flowfile_exec::{EngineConfig, EngineError, ExecutionEngine};
use flowfile_graph::{FlowGraph, RunInformation};
use flowfile_worker_client::{EmbeddedWorker, RemoteWorker, WorkerOffloadClient};
use std::path::Path;
use std::sync::Arc;

/// Everything a host needs to run flows: a resolved [`FlowfileConfig`] and
/// the `ExecutionEngine` built against whichever Worker Offload Client that
/// configuration names.
pub struct Flowfile {
    config: FlowfileConfig,
    engine: ExecutionEngine,
}

impl Flowfile {
    /// Resolves configuration from `FLOWFILE_*` environment variables (see
    /// [`FlowfileConfig::from_env`]) and builds the matching engine.
    pub fn new_from_env() -> Self {
        Self::new(FlowfileConfig::from_env())
    }

    pub fn new(config: FlowfileConfig) -> Self {
        let worker: Arc<dyn WorkerOffloadClient> = match &config.worker_endpoint {
            WorkerEndpoint::Embedded => Arc::new(EmbeddedWorker::new(config.cache_root.join("worker"), 1_000_000_000)),
            WorkerEndpoint::Remote(url) => Arc::new(RemoteWorker::new(url.clone())),
        };
        let engine_config = EngineConfig {
            cache_root: config.cache_root.clone(),
            ..EngineConfig::default()
        };
        let engine = ExecutionEngine::new(worker, engine_config);
        Self { config, engine }
    }

    pub fn config(&self) -> &FlowfileConfig {
        &self.config
    }

    /// Runs `graph` to completion (or the requested `target_node_ids`, if
    /// non-empty) under the engine this handle was built with.
    pub async fn run(&self, graph: &mut FlowGraph, target_node_ids: &[i64]) -> Result<RunInformation, EngineError> {
        self.engine.run(graph, target_node_ids).await
    }

    pub fn save(&self, graph: &FlowGraph, path: &Path) -> Result<(), PersistenceError> {
        save_graph(graph, path)
    }

    pub fn load(&self, path: &Path) -> Result<FlowGraph, PersistenceError> {
        load_graph(path)
    }
}

/// Installs a process-wide `tracing` subscriber reading its filter from
/// `RUST_LOG` (default `info`), the same convention the corpus uses for its
/// service entry points. Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowfile_graph::FlowSettings;

    #[tokio::test]
    async fn a_fresh_facade_runs_an_empty_graph() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = FlowfileConfig::default();
        config.cache_root = dir.path().to_path_buf();
        let flowfile = Flowfile::new(config);

        let mut graph = FlowGraph::new(1, FlowSettings::new(1, "empty"));
        let info = flowfile.run(&mut graph, &[]).await.unwrap();
        assert!(info.success);
        assert_eq!(info.nodes_completed, 0);
    }

    #[test]
    fn save_then_load_round_trips_an_empty_graph() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = FlowfileConfig::default();
        config.cache_root = dir.path().to_path_buf();
        let flowfile = Flowfile::new(config);

        let graph = FlowGraph::new(1, FlowSettings::new(1, "roundtrip"));
        let path = dir.path().join("flow.json");
        flowfile.save(&graph, &path).unwrap();
        let reloaded = flowfile.load(&path).unwrap();
        assert_eq!(reloaded.settings.flow_id, 1);
    }
}
