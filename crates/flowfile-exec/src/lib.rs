//! # Execution Engine
//!
//! Turns a `FlowGraph` into realized `DataHandle`s. Two schedulers share a
//! single materialization/offload path: Development mode pushes through
//! every reachable node and keeps each one's result around for inspection;
//! Performance mode pulls from sinks and only materializes what a sink (or
//! an explicit `cache_results` node) actually needs.

mod config;
mod engine;
mod error;

pub use config::EngineConfig;
pub use engine::ExecutionEngine;
pub use error::EngineError;
