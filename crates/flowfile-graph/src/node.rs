use crate::hash::{compute_hash, ParentHash};
use crate::result::{NodeResult, NodeRuntimeStats, RuntimeFlags};
use chrono::Utc;
use flowfile_data::DataHandle;
use flowfile_schema::{Schema, SchemaError};
use flowfile_settings::{DependsOn, NodeId, NodeKind, NodeSettings, Port};

fn is_streamable(kind: NodeKind) -> bool {
    !matches!(
        kind,
        NodeKind::Pivot | NodeKind::Sample | NodeKind::ManualInput | NodeKind::PolarsCode | NodeKind::UserDefined
    )
}

/// One node in a `FlowGraph`. Owns its settings, its content-addressed
/// identity, and whatever it has computed so far — nothing here reaches
/// into other nodes; the graph resolves parent/child references by id.
pub struct FlowNode {
    settings: NodeSettings,
    hash: blake3::Hash,
    cached_schema: Option<Schema>,
    result: Option<NodeResult>,
    stats: NodeRuntimeStats,
    runtime_flags: RuntimeFlags,
    needs_reset: bool,
}

impl FlowNode {
    /// Freezes `settings` into a new node with no parents yet hashed in.
    /// The graph calls `rehash` once the node's actual parent hashes are
    /// known (immediately on insertion, and again whenever a parent's own
    /// hash changes).
    pub fn new(settings: NodeSettings) -> Self {
        let kind = settings.kind();
        let hash = compute_hash(&settings, &[]);
        let cache_results = settings.common().cache_results;
        Self {
            settings,
            hash,
            cached_schema: None,
            result: None,
            stats: NodeRuntimeStats::default(),
            runtime_flags: RuntimeFlags {
                cache_results,
                streamable: is_streamable(kind),
            },
            needs_reset: true,
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.settings.node_id()
    }

    pub fn kind(&self) -> NodeKind {
        self.settings.kind()
    }

    pub fn settings(&self) -> &NodeSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut NodeSettings {
        &mut self.settings
    }

    pub fn hash(&self) -> blake3::Hash {
        self.hash
    }

    pub fn cached_schema(&self) -> Option<&Schema> {
        self.cached_schema.as_ref()
    }

    pub fn result(&self) -> Option<&NodeResult> {
        self.result.as_ref()
    }

    pub fn stats(&self) -> &NodeRuntimeStats {
        &self.stats
    }

    pub fn runtime_flags(&self) -> RuntimeFlags {
        self.runtime_flags
    }

    pub fn is_start(&self) -> bool {
        matches!(self.settings.depends_on(), DependsOn::None)
    }

    /// A variant-specific readiness check: does every port this kind
    /// requires currently have a resolved parent?
    pub fn has_required_inputs(&self, resolved_ports: &[Port]) -> bool {
        self.settings.required_ports().iter().all(|p| resolved_ports.contains(p))
    }

    /// Recomputes this node's hash against its current parent hashes.
    /// Returns `true` if the hash changed (the caller is then responsible
    /// for resetting this node and its descendants).
    pub fn rehash(&mut self, parents: &[ParentHash]) -> bool {
        let new_hash = compute_hash(&self.settings, parents);
        let changed = new_hash != self.hash;
        self.hash = new_hash;
        if changed {
            self.stats.has_run_with_current_hash = false;
        }
        changed
    }

    /// Pure schema prediction against the given parent schemas, in the
    /// port order `required_ports()` expects. Populates `cached_schema` on
    /// success; leaves it `None` on failure, per the "no stale schema"
    /// invariant.
    pub fn predict_schema(&mut self, inputs: &[Schema]) -> Result<Schema, SchemaError> {
        match self.settings.predict_schema(inputs) {
            Ok(schema) => {
                self.cached_schema = Some(schema.clone());
                Ok(schema)
            }
            Err(err) => {
                self.cached_schema = None;
                Err(err)
            }
        }
    }

    /// Drops a stale prediction when an upstream schema is unavailable,
    /// without touching `result` or `stats` the way a full `reset` does.
    pub fn clear_cached_schema(&mut self) {
        self.cached_schema = None;
    }

    /// Runs this node's transform against its resolved inputs. Does not
    /// itself decide in-process vs. Worker-offloaded materialization — the
    /// execution engine owns that choice and calls this with whatever
    /// `DataHandle`s it already resolved.
    pub fn execute(&mut self, inputs: &[DataHandle]) -> &NodeResult {
        let node_id = self.node_id();
        let start = Utc::now();
        self.stats.start_ts = Some(start);
        self.stats.is_canceled = false;

        // `cached_schema` is `None` here either for a kind whose own schema
        // is unknowable without data (Read, PolarsCode, ...) or for one
        // sitting directly downstream of such a kind. Re-derive it from the
        // actual resolved parent schemas rather than handing `apply` an
        // empty one — an empty schema silently drops every data column for
        // kinds (e.g. `RecordId`) that reconstruct their output from
        // `predicted`. For the unknowable-at-its-own-level case this still
        // errs and falls back to empty; `apply_read`/`apply_polars_code`
        // separately derive their real schema from the materialized plan.
        let schema = match &self.cached_schema {
            Some(schema) => schema.clone(),
            None => {
                let input_schemas: Vec<Schema> = inputs.iter().map(|h| h.schema().clone()).collect();
                self.settings.predict_schema(&input_schemas).unwrap_or_else(|_| Schema::empty())
            }
        };
        let outcome = self.settings.apply(inputs, schema);

        let end = Utc::now();
        self.stats.end_ts = Some(end);
        self.stats.runtime_ms = Some((end - start).num_milliseconds().max(0) as u64);
        self.stats.has_run = true;

        let result = match outcome {
            Ok(handle) => {
                self.cached_schema = Some(handle.schema().clone());
                self.stats.has_run_with_current_hash = true;
                self.stats.error = None;
                self.needs_reset = false;
                NodeResult {
                    node_id,
                    row_count: handle.materialization().row_count_hint(),
                    data_handle: Some(handle),
                    example_rows_path: None,
                    error: None,
                }
            }
            Err(err) => {
                self.stats.has_run_with_current_hash = false;
                self.stats.error = Some(err.to_string());
                NodeResult {
                    node_id,
                    data_handle: None,
                    example_rows_path: None,
                    error: Some(err.to_string()),
                    row_count: None,
                }
            }
        };

        self.result = Some(result);
        self.result.as_ref().expect("just assigned")
    }

    pub fn mark_canceled(&mut self) {
        self.stats.is_canceled = true;
    }

    /// Overwrites a previously-`execute`d result, e.g. once the execution
    /// engine has offloaded the in-memory `DataHandle` to the Worker and
    /// wants the node to carry the `OnDisk` handle (and, in Development
    /// mode, the sample path) from then on.
    pub fn set_result(&mut self, result: NodeResult) {
        self.stats.error = result.error.clone();
        self.stats.has_run_with_current_hash = result.error.is_none();
        self.result = Some(result);
    }

    pub fn needs_reset_now(&self) -> bool {
        self.needs_reset
    }

    pub fn mark_needs_reset(&mut self) {
        self.needs_reset = true;
    }

    /// Drops cached schema and result, per the reset-propagation invariant:
    /// a reset node (and, via `FlowGraph::rehash_and_cascade`, every
    /// descendant reachable from it) moves to `Dirty` with `needs_reset =
    /// true` until it is actually re-executed. Leaves `stats.has_run`
    /// untouched (it's sticky across resets) but clears
    /// `has_run_with_current_hash`.
    pub fn reset(&mut self) {
        self.cached_schema = None;
        self.result = None;
        self.stats.has_run_with_current_hash = false;
        self.needs_reset = true;
    }
}

impl std::fmt::Debug for FlowNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowNode")
            .field("node_id", &self.node_id())
            .field("kind", &self.kind())
            .field("hash", &self.hash.to_hex())
            .field("needs_reset", &self.needs_reset)
            .finish()
    }
}
