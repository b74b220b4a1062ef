use flowfile_graph::ExecutionMode;
use flowfile_settings::FileFormat;
use std::path::PathBuf;

/// How the Offload Client reaches the Worker: in-process, or over HTTP at
/// a base URL. Parsed from `FLOWFILE_WORKER_URL`, where the literal value
/// `embedded` selects the former.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkerEndpoint {
    Embedded,
    Remote(String),
}

/// Process-wide configuration, read once at startup from the four
/// `FLOWFILE_*` environment variables. Mirrors the `new_from_env`
/// convention the corpus uses for database/persistence setup: a `.env`
/// file is loaded best-effort (`dotenvy::dotenv().ok()`), then each
/// variable is read with a typed default so a bare `cargo run` still
/// works in a clean checkout.
#[derive(Clone, Debug)]
pub struct FlowfileConfig {
    pub cache_root: PathBuf,
    pub worker_endpoint: WorkerEndpoint,
    pub default_execution_mode: ExecutionMode,
    pub artifact_format: FileFormat,
}

impl FlowfileConfig {
    /// Loads a `.env` file if present (ignoring a missing one — this is a
    /// convenience for local development, not a requirement) and resolves
    /// the four recognized variables against their defaults.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let cache_root = std::env::var("FLOWFILE_CACHE_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".flowfile_cache"));

        let worker_endpoint = match std::env::var("FLOWFILE_WORKER_URL") {
            Ok(url) if url.eq_ignore_ascii_case("embedded") => WorkerEndpoint::Embedded,
            Ok(url) => WorkerEndpoint::Remote(url),
            Err(_) => WorkerEndpoint::Embedded,
        };

        let default_execution_mode = match std::env::var("FLOWFILE_EXECUTION_MODE_DEFAULT") {
            Ok(mode) if mode.eq_ignore_ascii_case("performance") => ExecutionMode::Performance,
            _ => ExecutionMode::Development,
        };

        let artifact_format = match std::env::var("FLOWFILE_ARTIFACT_FORMAT") {
            Ok(fmt) if fmt.eq_ignore_ascii_case("csv") => FileFormat::Csv,
            Ok(fmt) if fmt.eq_ignore_ascii_case("ipc") => FileFormat::Ipc,
            Ok(fmt) if fmt.eq_ignore_ascii_case("json") => FileFormat::Json,
            _ => FileFormat::Parquet,
        };

        Self {
            cache_root,
            worker_endpoint,
            default_execution_mode,
            artifact_format,
        }
    }
}

impl Default for FlowfileConfig {
    fn default() -> Self {
        Self {
            cache_root: PathBuf::from(".flowfile_cache"),
            worker_endpoint: WorkerEndpoint::Embedded,
            default_execution_mode: ExecutionMode::Development,
            artifact_format: FileFormat::Parquet,
        }
    }
}
