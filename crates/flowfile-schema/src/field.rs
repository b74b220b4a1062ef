use crate::{ColumnStats, TypeTag};
use serde::{Deserialize, Serialize};

/// A single column descriptor: name, logical type, declared position, and
/// nullability, plus optional observational statistics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub logical_type: TypeTag,
    pub position: i32,
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<ColumnStats>,
}

impl Field {
    pub fn new(name: impl Into<String>, logical_type: TypeTag, position: i32, nullable: bool) -> Self {
        Self {
            name: name.into(),
            logical_type,
            position,
            nullable,
            stats: None,
        }
    }

    pub fn with_stats(mut self, stats: ColumnStats) -> Self {
        self.stats = Some(stats);
        self
    }
}
