use std::path::PathBuf;
use std::time::Duration;

/// Engine-wide knobs that don't belong on any single flow: where
/// materialized artifacts land, how big a Development-mode preview sample
/// is, and the Worker polling cadence. `flowfile-core` populates this from
/// `FLOWFILE_*` environment variables; tests construct it directly.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub cache_root: PathBuf,
    /// Rows requested via `read_sample` for a Development-mode node's
    /// `example_rows_path`. Spec default: 100.
    pub sample_rows: usize,
    /// Per-call timeout on a single `poll`. Spec default: 60s.
    pub poll_timeout: Duration,
    /// Interval between successive `poll` calls while awaiting completion.
    pub poll_interval: Duration,
    /// Overall ceiling on how long the engine will await one task across
    /// all of its polls before giving up and surfacing a `WorkerError`.
    pub task_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_root: PathBuf::from(".flowfile_cache"),
            sample_rows: 100,
            poll_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(50),
            task_timeout: Duration::from_secs(300),
        }
    }
}
