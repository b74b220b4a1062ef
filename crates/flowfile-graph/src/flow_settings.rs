use chrono::{DateTime, Utc};
use flowfile_settings::FlowId;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Development,
    Performance,
}

impl Default for ExecutionMode {
    fn default() -> Self {
        ExecutionMode::Development
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionLocation {
    Local,
    Remote,
}

impl Default for ExecutionLocation {
    fn default() -> Self {
        ExecutionLocation::Local
    }
}

/// Flow-level configuration, independent of any single node. Everything
/// here is persisted; `is_running`/`is_canceled` are runtime flags that
/// happen to live on the same struct rather than a separate transient one,
/// matching how the rest of the graph keeps mutable run state close to the
/// thing it describes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FlowSettings {
    pub flow_id: FlowId,
    pub name: String,
    pub description: Option<String>,
    pub save_path: Option<String>,
    pub execution_mode: ExecutionMode,
    pub execution_location: ExecutionLocation,
    pub auto_save: bool,
    pub show_detailed_progress: bool,
    #[serde(skip)]
    pub is_running: bool,
    #[serde(skip)]
    pub is_canceled: bool,
    pub modified_on: DateTime<Utc>,
}

impl FlowSettings {
    pub fn new(flow_id: FlowId, name: impl Into<String>) -> Self {
        Self {
            flow_id,
            name: name.into(),
            description: None,
            save_path: None,
            execution_mode: ExecutionMode::default(),
            execution_location: ExecutionLocation::default(),
            auto_save: false,
            show_detailed_progress: true,
            is_running: false,
            is_canceled: false,
            modified_on: Utc::now(),
        }
    }

    pub fn touch(&mut self) {
        self.modified_on = Utc::now();
    }
}
