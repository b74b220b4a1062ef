use serde::{Deserialize, Serialize};

pub type FlowId = u64;
pub type NodeId = i64;

/// Sentinel used throughout the catalog for "no parent / unset".
pub const NO_PARENT: NodeId = -1;

/// The port a dependency edge terminates at. Only join-like kinds accept
/// `Left`/`Right`; every other kind accepts `Main` only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Port {
    Main,
    Left,
    Right,
}

impl std::fmt::Display for Port {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Port::Main => write!(f, "main"),
            Port::Left => write!(f, "left"),
            Port::Right => write!(f, "right"),
        }
    }
}

/// Fields every node kind carries regardless of payload. UI-only fields
/// (`pos_x`, `pos_y`, `description`) are excluded from content hashing so
/// layout edits never invalidate cached results.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommonSettings {
    pub flow_id: FlowId,
    pub node_id: NodeId,
    pub pos_x: f64,
    pub pos_y: f64,
    pub cache_results: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CommonSettings {
    pub fn new(flow_id: FlowId, node_id: NodeId) -> Self {
        Self {
            flow_id,
            node_id,
            pos_x: 0.0,
            pos_y: 0.0,
            cache_results: false,
            description: None,
        }
    }
}

/// How a node declares the nodes it depends on. The arity is fixed per kind:
/// zero-input kinds always report `None`, single-input kinds `Single`,
/// multi-input kinds `Multi`, and join-like kinds `TwoInput`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DependsOn {
    None,
    Single(NodeId),
    Multi(Vec<NodeId>),
    TwoInput { left: NodeId, right: NodeId },
}

impl DependsOn {
    /// Flattened `(node_id, port)` pairs, in the order a `FlowNode` should
    /// resolve parents.
    pub fn parent_refs(&self) -> Vec<(NodeId, Port)> {
        match self {
            DependsOn::None => Vec::new(),
            DependsOn::Single(id) if *id == NO_PARENT => Vec::new(),
            DependsOn::Single(id) => vec![(*id, Port::Main)],
            DependsOn::Multi(ids) => ids
                .iter()
                .filter(|id| **id != NO_PARENT)
                .map(|id| (*id, Port::Main))
                .collect(),
            DependsOn::TwoInput { left, right } => {
                let mut refs = Vec::new();
                if *left != NO_PARENT {
                    refs.push((*left, Port::Left));
                }
                if *right != NO_PARENT {
                    refs.push((*right, Port::Right));
                }
                refs
            }
        }
    }
}
