//! # FlowGraph
//!
//! The dataflow graph: node lifecycle, topology, content-addressed hashing,
//! and a reversible history log. A `FlowGraph` owns `FlowNode`s keyed by id;
//! edges are not a separate structure but live inside each node's own
//! `NodeSettings` payload, mutated through `set_parent`/`clear_parent`.

mod errors;
mod flow_settings;
mod graph;
mod hash;
mod history;
mod node;
mod result;

pub use errors::GraphIntegrityError;
pub use flow_settings::{ExecutionLocation, ExecutionMode, FlowSettings};
pub use graph::FlowGraph;
pub use hash::{compute_hash, ParentHash};
pub use history::{HistoryManager, Op};
pub use node::FlowNode;
pub use result::{NodeResult, NodeRuntimeStats, RunInformation, RuntimeFlags};
