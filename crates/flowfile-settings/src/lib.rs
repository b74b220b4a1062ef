//! # Settings Catalog
//!
//! A closed taxonomy of declarative configuration records, one variant per
//! node kind. Each variant carries exactly the data needed to realize its
//! transformation: a `depending_on_*` field (or none) for topology, plus a
//! kind-specific payload. Field-level validation against an input schema is
//! reported through `validate`, never by failing during graph construction.

mod catalog;
mod common;
mod error;
mod graph_solver;
mod schema_predict;
mod transform;
mod user_fn;

pub use catalog::*;
pub use common::{CommonSettings, DependsOn, Port, FlowId, NodeId, NO_PARENT};
pub use error::ValidationError;
pub use user_fn::{lookup_user_function, register_user_function, unregister_user_function, UserFunction};

use flowfile_schema::{Schema, SchemaError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The stable, logical name of a node kind — used as the Worker's task
/// label, the persisted flow file's `kind` field, and for registering a
/// closure/schema-callback pair with the graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Read,
    ManualInput,
    Filter,
    Formula,
    Select,
    Join,
    CrossJoin,
    Union,
    GroupBy,
    Pivot,
    Unpivot,
    Sort,
    Unique,
    Sample,
    RecordId,
    TextToRows,
    PolarsCode,
    GraphSolver,
    DatabaseReader,
    DatabaseWriter,
    CloudStorageReader,
    CloudStorageWriter,
    Output,
    ExternalSource,
    UserDefined,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Read => "read",
            NodeKind::ManualInput => "manual_input",
            NodeKind::Filter => "filter",
            NodeKind::Formula => "formula",
            NodeKind::Select => "select",
            NodeKind::Join => "join",
            NodeKind::CrossJoin => "cross_join",
            NodeKind::Union => "union",
            NodeKind::GroupBy => "group_by",
            NodeKind::Pivot => "pivot",
            NodeKind::Unpivot => "unpivot",
            NodeKind::Sort => "sort",
            NodeKind::Unique => "unique",
            NodeKind::Sample => "sample",
            NodeKind::RecordId => "record_id",
            NodeKind::TextToRows => "text_to_rows",
            NodeKind::PolarsCode => "polars_code",
            NodeKind::GraphSolver => "graph_solver",
            NodeKind::DatabaseReader => "database_reader",
            NodeKind::DatabaseWriter => "database_writer",
            NodeKind::CloudStorageReader => "cloud_storage_reader",
            NodeKind::CloudStorageWriter => "cloud_storage_writer",
            NodeKind::Output => "output",
            NodeKind::ExternalSource => "external_source",
            NodeKind::UserDefined => "user_defined",
        }
    }

    /// Whether this kind accepts `Left`/`Right` ports. Every other kind uses
    /// `Main` only.
    pub fn is_join_like(&self) -> bool {
        matches!(self, NodeKind::Join | NodeKind::CrossJoin)
    }
}

/// The tagged union over the Settings Catalog. One variant per node kind;
/// adding a kind means declaring its payload here, a schema callback in
/// `schema_predict`, a closure in `flowfile-exec`'s transform dispatch, and
/// registering the triple under the kind's logical name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeSettings {
    Read(ReadSettings),
    ManualInput(ManualInputSettings),
    Filter(FilterSettings),
    Formula(FormulaSettings),
    Select(SelectSettings),
    Join(JoinSettings),
    CrossJoin(CrossJoinSettings),
    Union(UnionSettings),
    GroupBy(GroupBySettings),
    Pivot(PivotSettings),
    Unpivot(UnpivotSettings),
    Sort(SortSettings),
    Unique(UniqueSettings),
    Sample(SampleSettings),
    RecordId(RecordIdSettings),
    TextToRows(TextToRowsSettings),
    PolarsCode(PolarsCodeSettings),
    GraphSolver(GraphSolverSettings),
    DatabaseReader(DatabaseReaderSettings),
    DatabaseWriter(DatabaseWriterSettings),
    CloudStorageReader(CloudStorageReaderSettings),
    CloudStorageWriter(CloudStorageWriterSettings),
    Output(OutputSettings),
    ExternalSource(ExternalSourceSettings),
    UserDefined(UserDefinedSettings),
}

macro_rules! for_each_variant {
    ($self:expr, $binding:ident => $body:expr) => {
        match $self {
            NodeSettings::Read($binding) => $body,
            NodeSettings::ManualInput($binding) => $body,
            NodeSettings::Filter($binding) => $body,
            NodeSettings::Formula($binding) => $body,
            NodeSettings::Select($binding) => $body,
            NodeSettings::Join($binding) => $body,
            NodeSettings::CrossJoin($binding) => $body,
            NodeSettings::Union($binding) => $body,
            NodeSettings::GroupBy($binding) => $body,
            NodeSettings::Pivot($binding) => $body,
            NodeSettings::Unpivot($binding) => $body,
            NodeSettings::Sort($binding) => $body,
            NodeSettings::Unique($binding) => $body,
            NodeSettings::Sample($binding) => $body,
            NodeSettings::RecordId($binding) => $body,
            NodeSettings::TextToRows($binding) => $body,
            NodeSettings::PolarsCode($binding) => $body,
            NodeSettings::GraphSolver($binding) => $body,
            NodeSettings::DatabaseReader($binding) => $body,
            NodeSettings::DatabaseWriter($binding) => $body,
            NodeSettings::CloudStorageReader($binding) => $body,
            NodeSettings::CloudStorageWriter($binding) => $body,
            NodeSettings::Output($binding) => $body,
            NodeSettings::ExternalSource($binding) => $body,
            NodeSettings::UserDefined($binding) => $body,
        }
    };
}

impl NodeSettings {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeSettings::Read(_) => NodeKind::Read,
            NodeSettings::ManualInput(_) => NodeKind::ManualInput,
            NodeSettings::Filter(_) => NodeKind::Filter,
            NodeSettings::Formula(_) => NodeKind::Formula,
            NodeSettings::Select(_) => NodeKind::Select,
            NodeSettings::Join(_) => NodeKind::Join,
            NodeSettings::CrossJoin(_) => NodeKind::CrossJoin,
            NodeSettings::Union(_) => NodeKind::Union,
            NodeSettings::GroupBy(_) => NodeKind::GroupBy,
            NodeSettings::Pivot(_) => NodeKind::Pivot,
            NodeSettings::Unpivot(_) => NodeKind::Unpivot,
            NodeSettings::Sort(_) => NodeKind::Sort,
            NodeSettings::Unique(_) => NodeKind::Unique,
            NodeSettings::Sample(_) => NodeKind::Sample,
            NodeSettings::RecordId(_) => NodeKind::RecordId,
            NodeSettings::TextToRows(_) => NodeKind::TextToRows,
            NodeSettings::PolarsCode(_) => NodeKind::PolarsCode,
            NodeSettings::GraphSolver(_) => NodeKind::GraphSolver,
            NodeSettings::DatabaseReader(_) => NodeKind::DatabaseReader,
            NodeSettings::DatabaseWriter(_) => NodeKind::DatabaseWriter,
            NodeSettings::CloudStorageReader(_) => NodeKind::CloudStorageReader,
            NodeSettings::CloudStorageWriter(_) => NodeKind::CloudStorageWriter,
            NodeSettings::Output(_) => NodeKind::Output,
            NodeSettings::ExternalSource(_) => NodeKind::ExternalSource,
            NodeSettings::UserDefined(_) => NodeKind::UserDefined,
        }
    }

    pub fn common(&self) -> &CommonSettings {
        for_each_variant!(self, s => &s.common)
    }

    pub fn common_mut(&mut self) -> &mut CommonSettings {
        for_each_variant!(self, s => &mut s.common)
    }

    pub fn flow_id(&self) -> FlowId {
        self.common().flow_id
    }

    pub fn node_id(&self) -> NodeId {
        self.common().node_id
    }

    /// The parents this node declares, independent of whether they
    /// currently resolve to an existing node in the graph.
    pub fn depends_on(&self) -> DependsOn {
        match self {
            NodeSettings::Read(_)
            | NodeSettings::ManualInput(_)
            | NodeSettings::ExternalSource(_)
            | NodeSettings::CloudStorageReader(_)
            | NodeSettings::DatabaseReader(_) => DependsOn::None,

            NodeSettings::Union(s) => DependsOn::Multi(s.depending_on_ids.clone()),
            NodeSettings::UserDefined(s) => DependsOn::Multi(s.depending_on_ids.clone()),

            NodeSettings::Join(s) => DependsOn::TwoInput {
                left: s.depending_on_id_left,
                right: s.depending_on_id_right,
            },
            NodeSettings::CrossJoin(s) => DependsOn::TwoInput {
                left: s.depending_on_id_left,
                right: s.depending_on_id_right,
            },

            NodeSettings::Filter(s) => DependsOn::single(s.depending_on_id),
            NodeSettings::Formula(s) => DependsOn::single(s.depending_on_id),
            NodeSettings::Select(s) => DependsOn::single(s.depending_on_id),
            NodeSettings::GroupBy(s) => DependsOn::single(s.depending_on_id),
            NodeSettings::Pivot(s) => DependsOn::single(s.depending_on_id),
            NodeSettings::Unpivot(s) => DependsOn::single(s.depending_on_id),
            NodeSettings::Sort(s) => DependsOn::single(s.depending_on_id),
            NodeSettings::Unique(s) => DependsOn::single(s.depending_on_id),
            NodeSettings::Sample(s) => DependsOn::single(s.depending_on_id),
            NodeSettings::RecordId(s) => DependsOn::single(s.depending_on_id),
            NodeSettings::TextToRows(s) => DependsOn::single(s.depending_on_id),
            NodeSettings::PolarsCode(s) => DependsOn::single(s.depending_on_id),
            NodeSettings::GraphSolver(s) => DependsOn::single(s.depending_on_id),
            NodeSettings::DatabaseWriter(s) => DependsOn::single(s.depending_on_id),
            NodeSettings::CloudStorageWriter(s) => DependsOn::single(s.depending_on_id),
            NodeSettings::Output(s) => DependsOn::single(s.depending_on_id),
        }
    }

    pub fn required_ports(&self) -> &'static [Port] {
        if self.kind().is_join_like() {
            &[Port::Left, Port::Right]
        } else if matches!(self.depends_on(), DependsOn::None) {
            &[]
        } else {
            &[Port::Main]
        }
    }

    /// The content-addressed payload: the kind-specific fields only, with
    /// `common`'s UI-only fields (`pos_x`, `pos_y`, `description`) and
    /// identity fields excluded so layout edits and the node's own id never
    /// perturb the hash.
    pub fn canonical_payload(&self) -> Value {
        let full = for_each_variant!(self, s => serde_json::to_value(s).unwrap_or(Value::Null));
        match full {
            Value::Object(mut map) => {
                map.remove("common");
                Value::Object(map)
            }
            other => other,
        }
    }

    pub fn validate(&self, inputs: &[Schema]) -> Result<(), ValidationError> {
        schema_predict::validate(self, inputs)
    }

    /// Pure function `(settings, input_schemas) -> output_schema`. Never
    /// reads data; populates nothing by itself — the caller (`FlowNode`)
    /// owns caching the result.
    pub fn predict_schema(&self, inputs: &[Schema]) -> Result<Schema, SchemaError> {
        schema_predict::predict(self, inputs)
    }

    /// Points the given port at `parent_id`. Multi-input kinds append
    /// `parent_id` if it isn't already present. Returns `false` if this
    /// kind doesn't accept a parent at `port` (e.g. `Main` on a join-like
    /// kind, or any port on a zero-input kind).
    pub fn set_parent(&mut self, port: Port, parent_id: NodeId) -> bool {
        match self {
            NodeSettings::Read(_)
            | NodeSettings::ManualInput(_)
            | NodeSettings::ExternalSource(_)
            | NodeSettings::CloudStorageReader(_)
            | NodeSettings::DatabaseReader(_) => false,

            NodeSettings::Union(s) if port == Port::Main => {
                if !s.depending_on_ids.contains(&parent_id) {
                    s.depending_on_ids.push(parent_id);
                }
                true
            }
            NodeSettings::UserDefined(s) if port == Port::Main => {
                if !s.depending_on_ids.contains(&parent_id) {
                    s.depending_on_ids.push(parent_id);
                }
                true
            }

            NodeSettings::Join(s) => match port {
                Port::Left => {
                    s.depending_on_id_left = parent_id;
                    true
                }
                Port::Right => {
                    s.depending_on_id_right = parent_id;
                    true
                }
                Port::Main => false,
            },
            NodeSettings::CrossJoin(s) => match port {
                Port::Left => {
                    s.depending_on_id_left = parent_id;
                    true
                }
                Port::Right => {
                    s.depending_on_id_right = parent_id;
                    true
                }
                Port::Main => false,
            },

            NodeSettings::Filter(s) if port == Port::Main => {
                s.depending_on_id = parent_id;
                true
            }
            NodeSettings::Formula(s) if port == Port::Main => {
                s.depending_on_id = parent_id;
                true
            }
            NodeSettings::Select(s) if port == Port::Main => {
                s.depending_on_id = parent_id;
                true
            }
            NodeSettings::GroupBy(s) if port == Port::Main => {
                s.depending_on_id = parent_id;
                true
            }
            NodeSettings::Pivot(s) if port == Port::Main => {
                s.depending_on_id = parent_id;
                true
            }
            NodeSettings::Unpivot(s) if port == Port::Main => {
                s.depending_on_id = parent_id;
                true
            }
            NodeSettings::Sort(s) if port == Port::Main => {
                s.depending_on_id = parent_id;
                true
            }
            NodeSettings::Unique(s) if port == Port::Main => {
                s.depending_on_id = parent_id;
                true
            }
            NodeSettings::Sample(s) if port == Port::Main => {
                s.depending_on_id = parent_id;
                true
            }
            NodeSettings::RecordId(s) if port == Port::Main => {
                s.depending_on_id = parent_id;
                true
            }
            NodeSettings::TextToRows(s) if port == Port::Main => {
                s.depending_on_id = parent_id;
                true
            }
            NodeSettings::PolarsCode(s) if port == Port::Main => {
                s.depending_on_id = parent_id;
                true
            }
            NodeSettings::GraphSolver(s) if port == Port::Main => {
                s.depending_on_id = parent_id;
                true
            }
            NodeSettings::DatabaseWriter(s) if port == Port::Main => {
                s.depending_on_id = parent_id;
                true
            }
            NodeSettings::CloudStorageWriter(s) if port == Port::Main => {
                s.depending_on_id = parent_id;
                true
            }
            NodeSettings::Output(s) if port == Port::Main => {
                s.depending_on_id = parent_id;
                true
            }

            _ => false,
        }
    }

    /// Removes `parent_id` from the given port. For `Multi` kinds this
    /// drops just that id; for `Single`/`TwoInput` kinds it resets the
    /// slot to [`NO_PARENT`].
    pub fn clear_parent(&mut self, port: Port, parent_id: NodeId) {
        match self {
            NodeSettings::Union(s) => s.depending_on_ids.retain(|id| *id != parent_id),
            NodeSettings::UserDefined(s) => s.depending_on_ids.retain(|id| *id != parent_id),
            NodeSettings::Join(s) => match port {
                Port::Left if s.depending_on_id_left == parent_id => s.depending_on_id_left = NO_PARENT,
                Port::Right if s.depending_on_id_right == parent_id => s.depending_on_id_right = NO_PARENT,
                _ => {}
            },
            NodeSettings::CrossJoin(s) => match port {
                Port::Left if s.depending_on_id_left == parent_id => s.depending_on_id_left = NO_PARENT,
                Port::Right if s.depending_on_id_right == parent_id => s.depending_on_id_right = NO_PARENT,
                _ => {}
            },
            NodeSettings::Filter(s) if s.depending_on_id == parent_id => s.depending_on_id = NO_PARENT,
            NodeSettings::Formula(s) if s.depending_on_id == parent_id => s.depending_on_id = NO_PARENT,
            NodeSettings::Select(s) if s.depending_on_id == parent_id => s.depending_on_id = NO_PARENT,
            NodeSettings::GroupBy(s) if s.depending_on_id == parent_id => s.depending_on_id = NO_PARENT,
            NodeSettings::Pivot(s) if s.depending_on_id == parent_id => s.depending_on_id = NO_PARENT,
            NodeSettings::Unpivot(s) if s.depending_on_id == parent_id => s.depending_on_id = NO_PARENT,
            NodeSettings::Sort(s) if s.depending_on_id == parent_id => s.depending_on_id = NO_PARENT,
            NodeSettings::Unique(s) if s.depending_on_id == parent_id => s.depending_on_id = NO_PARENT,
            NodeSettings::Sample(s) if s.depending_on_id == parent_id => s.depending_on_id = NO_PARENT,
            NodeSettings::RecordId(s) if s.depending_on_id == parent_id => s.depending_on_id = NO_PARENT,
            NodeSettings::TextToRows(s) if s.depending_on_id == parent_id => s.depending_on_id = NO_PARENT,
            NodeSettings::PolarsCode(s) if s.depending_on_id == parent_id => s.depending_on_id = NO_PARENT,
            NodeSettings::GraphSolver(s) if s.depending_on_id == parent_id => s.depending_on_id = NO_PARENT,
            NodeSettings::DatabaseWriter(s) if s.depending_on_id == parent_id => s.depending_on_id = NO_PARENT,
            NodeSettings::CloudStorageWriter(s) if s.depending_on_id == parent_id => s.depending_on_id = NO_PARENT,
            NodeSettings::Output(s) if s.depending_on_id == parent_id => s.depending_on_id = NO_PARENT,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn common(node_id: i64) -> CommonSettings {
        CommonSettings::new(1, node_id)
    }

    #[test]
    fn canonical_payload_excludes_ui_fields() {
        let mut a = FilterSettings {
            common: common(2),
            depending_on_id: 1,
            predicate: "x > 1".into(),
        };
        let mut b = a.clone();
        a.common.pos_x = 10.0;
        b.common.pos_x = 999.0;
        a.common.description = Some("a".into());
        b.common.description = Some("b".into());

        let sa = NodeSettings::Filter(a);
        let sb = NodeSettings::Filter(b);
        assert_eq!(sa.canonical_payload(), sb.canonical_payload());
    }

    #[test]
    fn canonical_payload_differs_on_predicate_change() {
        let base = FilterSettings {
            common: common(2),
            depending_on_id: 1,
            predicate: "x > 1".into(),
        };
        let mut changed = base.clone();
        changed.predicate = "x > 2".into();
        assert_ne!(
            NodeSettings::Filter(base).canonical_payload(),
            NodeSettings::Filter(changed).canonical_payload()
        );
    }

    #[test]
    fn join_requires_left_and_right() {
        let s = NodeSettings::Join(JoinSettings {
            common: common(3),
            depending_on_id_left: 1,
            depending_on_id_right: 2,
            left_on: vec!["id".into()],
            right_on: vec!["id".into()],
            how: JoinHow::Inner,
            suffix: "_right".into(),
        });
        assert_eq!(s.required_ports(), &[Port::Left, Port::Right]);
        assert!(matches!(
            s.depends_on(),
            DependsOn::TwoInput { left: 1, right: 2 }
        ));
    }
}
