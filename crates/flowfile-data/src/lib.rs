//! # Data Handle
//!
//! An owning wrapper around a Columnar Lazy Engine (CLE) plan — concretely,
//! a `polars::prelude::LazyFrame` — plus its schema metadata and
//! materialization state. Consumers can always ask a `DataHandle` for its
//! schema without forcing collection, and must explicitly request sampling
//! vs. full collection.

mod convert;
mod error;
mod materialization;

pub use convert::{schema_from_polars, type_tag_from_polars};
pub use error::TransformError;
pub use materialization::Materialization;

use flowfile_schema::Schema;
use polars::prelude::{DataFrame, IntoLazy, LazyFrame};
use std::path::{Path, PathBuf};

/// The core's handle on one node's output: a lazy plan, its predicted
/// schema, and how (if at all) it has been materialized so far.
#[derive(Clone)]
pub struct DataHandle {
    plan: LazyFrame,
    schema: Schema,
    materialization: Materialization,
}

impl DataHandle {
    /// Wraps a freshly-built lazy plan with its (already predicted) schema.
    /// The handle starts `Lazy`: nothing has been collected or sunk yet.
    pub fn from_plan(plan: LazyFrame, schema: Schema) -> Self {
        Self {
            plan,
            schema,
            materialization: Materialization::Lazy,
        }
    }

    /// Wraps an already-collected `DataFrame`, e.g. for `manual_input` nodes
    /// or small Development-mode results collected in process.
    pub fn from_dataframe(df: DataFrame, schema: Schema) -> Self {
        let plan = df.clone().lazy();
        Self {
            plan,
            schema,
            materialization: Materialization::InMemory(df),
        }
    }

    /// Wraps a handle backed by an on-disk columnar artifact (written by the
    /// Worker), scanning it lazily so downstream nodes compose a plan
    /// without re-reading until something collects.
    pub fn from_on_disk(path: PathBuf, file_ref: crate::materialization::FileRef, schema: Schema) -> Result<Self, TransformError> {
        let plan = LazyFrame::scan_parquet(&path, Default::default())
            .map_err(|e| TransformError::Engine(e.to_string()))?;
        Ok(Self {
            plan,
            schema,
            materialization: Materialization::OnDisk { path, file_ref },
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn materialization(&self) -> &Materialization {
        &self.materialization
    }

    pub fn is_materialized(&self) -> bool {
        !matches!(self.materialization, Materialization::Lazy)
    }

    /// The underlying lazy plan, for composing further transformations or
    /// handing to the Worker Offload Client as a serializable plan.
    pub fn lazy(&self) -> LazyFrame {
        self.plan.clone()
    }

    /// Forces full collection into memory. Never called by `predict_schema`.
    pub fn collect(&self) -> Result<DataFrame, TransformError> {
        self.plan
            .clone()
            .collect()
            .map_err(|e| TransformError::Engine(e.to_string()))
    }

    /// Returns up to `n` rows without collecting the full result.
    pub fn sample(&self, n: usize) -> Result<DataFrame, TransformError> {
        self.plan
            .clone()
            .limit(n as u32)
            .collect()
            .map_err(|e| TransformError::Engine(e.to_string()))
    }

    /// Streams the plan to a parquet file at `path`, using write-then-rename
    /// so a partially-written artifact is never observable at its final path.
    pub fn sink_parquet(&self, path: &Path, file_ref: crate::materialization::FileRef) -> Result<Self, TransformError> {
        let tmp_path = path.with_extension("parquet.tmp");
        self.plan
            .clone()
            .sink_parquet(&tmp_path, Default::default())
            .map_err(|e| TransformError::Engine(e.to_string()))?;
        std::fs::rename(&tmp_path, path).map_err(|e| TransformError::Io(e.to_string()))?;

        Self::from_on_disk(path.to_path_buf(), file_ref, self.schema.clone())
    }
}

impl std::fmt::Debug for DataHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataHandle")
            .field("schema_len", &self.schema.len())
            .field("materialization", &self.materialization)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    #[test]
    fn fresh_plan_is_lazy() {
        let df = df!["a" => [1i64, 2, 3]].unwrap();
        let schema = schema_from_polars(&df.schema());
        let handle = DataHandle::from_dataframe(df, schema);
        assert!(handle.is_materialized());
        let reselected = DataHandle::from_plan(handle.lazy().select([polars::prelude::col("a")]), handle.schema().clone());
        assert!(!reselected.is_materialized());
    }

    #[test]
    fn sample_does_not_require_full_collect() {
        let df = df!["a" => (0..1000i64).collect::<Vec<_>>()].unwrap();
        let schema = schema_from_polars(&df.schema());
        let handle = DataHandle::from_dataframe(df, schema);
        let sampled = handle.sample(5).unwrap();
        assert_eq!(sampled.height(), 5);
    }
}
