use flowfile_settings::{NodeId, Port};
use thiserror::Error;

/// Fatal to the triggering mutation; the graph is left unchanged on any of
/// these.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphIntegrityError {
    #[error("node {0} already exists in this graph")]
    DuplicateNodeId(NodeId),

    #[error("node {0} does not exist in this graph")]
    UnknownNode(NodeId),

    #[error("connecting node {from} to node {to} at port {port} would create a cycle")]
    CycleDetected { from: NodeId, to: NodeId, port: Port },

    #[error("node {node_id} already has a parent connected at port {port}")]
    PortOccupied { node_id: NodeId, port: Port },

    #[error("{kind} does not accept a connection at port {port}")]
    InvalidPort { kind: &'static str, port: Port },

    #[error("node {0} has no connection at port {1}")]
    NoSuchConnection(NodeId, Port),
}
