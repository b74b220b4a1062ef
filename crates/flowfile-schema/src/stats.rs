use serde::{Deserialize, Serialize};

/// Optional, purely observational column statistics.
///
/// Populated after materialization (the Worker or an in-process collect can
/// fill these in); never required for schema equality or prediction.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub null_count: Option<u64>,
    pub distinct_count: Option<u64>,
    pub min: Option<serde_json::Value>,
    pub max: Option<serde_json::Value>,
}
