use crate::common::{CommonSettings, DependsOn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

macro_rules! settings_struct {
    ($name:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
        pub struct $name {
            pub common: CommonSettings,
            $(pub $field: $ty,)*
        }
    };
}

// --- Zero-input kinds ---

settings_struct!(ReadSettings {
    path: String,
    file_format: FileFormat,
    has_header: bool,
});

settings_struct!(ManualInputSettings {
    rows: Vec<HashMap<String, Value>>,
});

settings_struct!(ExternalSourceSettings {
    source_id: String,
    options: HashMap<String, Value>,
});

settings_struct!(CloudStorageReaderSettings {
    bucket: String,
    object_key: String,
    file_format: FileFormat,
    connection_ref: String,
});

settings_struct!(DatabaseReaderSettings {
    connection_ref: String,
    query: String,
});

// --- Single-input kinds ---

settings_struct!(FilterSettings {
    depending_on_id: i64,
    predicate: String,
});

settings_struct!(FormulaSettings {
    depending_on_id: i64,
    output_column: String,
    expression: String,
});

settings_struct!(SelectSettings {
    depending_on_id: i64,
    columns: Vec<SelectColumn>,
});

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectColumn {
    pub original_name: String,
    pub renamed_to: Option<String>,
    pub keep: bool,
}

settings_struct!(GroupBySettings {
    depending_on_id: i64,
    group_by_columns: Vec<String>,
    aggregations: Vec<Aggregation>,
});

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    pub column: String,
    pub agg: AggFunc,
    pub output_column: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggFunc {
    Sum,
    Mean,
    Min,
    Max,
    Count,
    First,
    Last,
}

settings_struct!(PivotSettings {
    depending_on_id: i64,
    index_columns: Vec<String>,
    pivot_column: String,
    value_column: String,
    agg: AggFunc,
});

settings_struct!(UnpivotSettings {
    depending_on_id: i64,
    index_columns: Vec<String>,
    value_columns: Vec<String>,
});

settings_struct!(SortSettings {
    depending_on_id: i64,
    by: Vec<SortKey>,
});

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SortKey {
    pub column: String,
    pub descending: bool,
}

settings_struct!(UniqueSettings {
    depending_on_id: i64,
    subset: Option<Vec<String>>,
    keep: UniqueKeep,
});

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UniqueKeep {
    First,
    Last,
    Any,
}

settings_struct!(SampleSettings {
    depending_on_id: i64,
    n: usize,
    seed: Option<u64>,
});

settings_struct!(RecordIdSettings {
    depending_on_id: i64,
    output_column: String,
    offset: i64,
});

settings_struct!(TextToRowsSettings {
    depending_on_id: i64,
    column: String,
    delimiter: String,
    output_column: String,
});

settings_struct!(PolarsCodeSettings {
    depending_on_id: i64,
    code: String,
});

settings_struct!(GraphSolverSettings {
    depending_on_id: i64,
    from_column: String,
    to_column: String,
    output_column: String,
});

settings_struct!(DatabaseWriterSettings {
    depending_on_id: i64,
    connection_ref: String,
    table: String,
    write_mode: WriteMode,
});

settings_struct!(CloudStorageWriterSettings {
    depending_on_id: i64,
    bucket: String,
    object_key: String,
    file_format: FileFormat,
    connection_ref: String,
});

settings_struct!(OutputSettings {
    depending_on_id: i64,
    path: String,
    file_format: FileFormat,
    write_mode: WriteMode,
});

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteMode {
    Overwrite,
    Append,
}

// --- Multi-input kinds ---

settings_struct!(UnionSettings {
    depending_on_ids: Vec<i64>,
});

settings_struct!(UserDefinedSettings {
    depending_on_ids: Vec<i64>,
    function_id: String,
    params: HashMap<String, Value>,
});

// --- Two-input kinds ---

settings_struct!(JoinSettings {
    depending_on_id_left: i64,
    depending_on_id_right: i64,
    left_on: Vec<String>,
    right_on: Vec<String>,
    how: JoinHow,
    suffix: String,
});

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinHow {
    Inner,
    Left,
    Outer,
    Semi,
    Anti,
}

settings_struct!(CrossJoinSettings {
    depending_on_id_left: i64,
    depending_on_id_right: i64,
    suffix: String,
});

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileFormat {
    Csv,
    Parquet,
    Json,
    Ipc,
}

impl DependsOn {
    pub(crate) fn single(id: i64) -> Self {
        DependsOn::Single(id)
    }
}
