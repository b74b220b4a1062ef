use polars::prelude::DataFrame;
use std::path::PathBuf;

/// Content-addressed identity of a materialized artifact: the same 32-byte
/// digest as `FlowNode::hash`, reused as the Worker's cache key so identical
/// plans across nodes or runs deduplicate automatically.
pub type FileRef = blake3::Hash;

/// The three lifecycle states a `DataHandle` can be in. `Lazy` and `OnDisk`
/// must never be conflated with `InMemory`: only the first two let a
/// consumer ask for a schema without paying for materialization, while
/// `InMemory` means collection has already happened.
#[derive(Clone)]
pub enum Materialization {
    /// Nothing has been collected or sunk; `plan` is still just a recipe.
    Lazy,
    /// Fully collected into memory (small results, or a Development-mode
    /// node collected in process rather than offloaded).
    InMemory(DataFrame),
    /// Written to a columnar file on disk, keyed by `file_ref`.
    OnDisk { path: PathBuf, file_ref: FileRef },
}

impl Materialization {
    /// A row count if one is already known without collecting — only
    /// `InMemory` has one; `Lazy` and `OnDisk` would require running the
    /// plan or re-reading the file footer.
    pub fn row_count_hint(&self) -> Option<u64> {
        match self {
            Materialization::InMemory(df) => Some(df.height() as u64),
            Materialization::Lazy | Materialization::OnDisk { .. } => None,
        }
    }
}

impl std::fmt::Debug for Materialization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Materialization::Lazy => write!(f, "Lazy"),
            Materialization::InMemory(df) => write!(f, "InMemory({} rows)", df.height()),
            Materialization::OnDisk { path, file_ref } => {
                write!(f, "OnDisk({}, {})", path.display(), file_ref.to_hex())
            }
        }
    }
}
