use flowfile_data::Materialization;
use flowfile_exec::{EngineConfig, ExecutionEngine};
use flowfile_graph::{ExecutionMode, FlowGraph, FlowSettings};
use flowfile_settings::{
    Aggregation, AggFunc, CommonSettings, FileFormat, FilterSettings, GroupBySettings, JoinHow, JoinSettings,
    ManualInputSettings, NodeSettings, OutputSettings, Port, WriteMode, NO_PARENT,
};
use flowfile_worker_client::EmbeddedWorker;
use std::collections::HashMap;
use std::sync::Arc;

fn manual_input(node_id: i64, rows: Vec<HashMap<String, serde_json::Value>>) -> NodeSettings {
    NodeSettings::ManualInput(ManualInputSettings {
        common: CommonSettings::new(1, node_id),
        rows,
    })
}

fn filter(node_id: i64, predicate: &str) -> NodeSettings {
    NodeSettings::Filter(FilterSettings {
        common: CommonSettings::new(1, node_id),
        depending_on_id: NO_PARENT,
        predicate: predicate.to_string(),
    })
}

fn group_by(node_id: i64) -> NodeSettings {
    NodeSettings::GroupBy(GroupBySettings {
        common: CommonSettings::new(1, node_id),
        depending_on_id: NO_PARENT,
        group_by_columns: vec!["b".to_string()],
        aggregations: vec![Aggregation {
            column: "a".to_string(),
            agg: AggFunc::Sum,
            output_column: "a_sum".to_string(),
        }],
    })
}

fn output(node_id: i64) -> NodeSettings {
    NodeSettings::Output(OutputSettings {
        common: CommonSettings::new(1, node_id),
        depending_on_id: NO_PARENT,
        path: "unused.parquet".to_string(),
        file_format: FileFormat::Parquet,
        write_mode: WriteMode::Overwrite,
    })
}

fn rows() -> Vec<HashMap<String, serde_json::Value>> {
    vec![
        HashMap::from([("a".to_string(), serde_json::json!(1)), ("b".to_string(), serde_json::json!("x"))]),
        HashMap::from([("a".to_string(), serde_json::json!(2)), ("b".to_string(), serde_json::json!("y"))]),
        HashMap::from([("a".to_string(), serde_json::json!(-1)), ("b".to_string(), serde_json::json!("x"))]),
    ]
}

fn chain_graph(mode: ExecutionMode) -> FlowGraph {
    let mut settings = FlowSettings::new(1, "test");
    settings.execution_mode = mode;
    let mut g = FlowGraph::new(1, settings);
    g.add_node_step(manual_input(1, rows())).unwrap();
    g.add_node_step(filter(2, "a > 0")).unwrap();
    g.add_node_step(group_by(3)).unwrap();
    g.add_node_step(output(4)).unwrap();
    g.connect_node(2, Port::Main, 1).unwrap();
    g.connect_node(3, Port::Main, 2).unwrap();
    g.connect_node(4, Port::Main, 3).unwrap();
    g
}

fn engine(cache_root: &std::path::Path) -> ExecutionEngine {
    let worker = Arc::new(EmbeddedWorker::new(cache_root.join("worker"), 50_000_000));
    let config = EngineConfig {
        cache_root: cache_root.join("samples"),
        ..EngineConfig::default()
    };
    ExecutionEngine::new(worker, config)
}

#[tokio::test]
async fn development_mode_runs_every_reachable_node_and_samples_it() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path());
    let mut graph = chain_graph(ExecutionMode::Development);

    let info = engine.run(&mut graph, &[]).await.unwrap();
    assert!(info.success);
    assert_eq!(info.nodes_completed, 4);

    for node_id in [1, 2, 3, 4] {
        let node = graph.node(node_id).unwrap();
        let result = node.result().expect("every node ran");
        assert!(result.is_success());
        assert!(result.example_rows_path.is_some(), "node {node_id} should carry a preview sample");
    }

    let filtered = graph.node(2).unwrap().result().unwrap();
    assert_eq!(filtered.row_count, Some(2));
}

#[tokio::test]
async fn development_mode_reuses_unchanged_results_on_a_second_run() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path());
    let mut graph = chain_graph(ExecutionMode::Development);

    engine.run(&mut graph, &[]).await.unwrap();
    let first_hash = graph.node(3).unwrap().hash();

    let info = engine.run(&mut graph, &[]).await.unwrap();
    assert!(info.success);
    let second_hash = graph.node(3).unwrap().hash();
    assert_eq!(first_hash, second_hash, "hash is stable across runs with no settings change");
    assert_eq!(graph.node(3).unwrap().result().unwrap().row_count, Some(2));
}

#[tokio::test]
async fn performance_mode_only_materializes_the_sink() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path());
    let mut graph = chain_graph(ExecutionMode::Performance);

    let info = engine.run(&mut graph, &[]).await.unwrap();
    assert!(info.success);

    let sink_result = graph.node(4).unwrap().result().unwrap();
    assert!(matches!(sink_result.data_handle.as_ref().unwrap().materialization(), Materialization::InMemory(_)));

    let filter_result = graph.node(2).unwrap().result().unwrap();
    assert!(matches!(filter_result.data_handle.as_ref().unwrap().materialization(), Materialization::Lazy));
}

#[tokio::test]
async fn performance_mode_respects_cache_results_on_an_intermediate_node() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path());
    let mut graph = chain_graph(ExecutionMode::Performance);
    graph.node_mut(2).unwrap().settings_mut().common_mut().cache_results = true;

    engine.run(&mut graph, &[]).await.unwrap();
    let filter_result = graph.node(2).unwrap().result().unwrap();
    assert!(matches!(filter_result.data_handle.as_ref().unwrap().materialization(), Materialization::InMemory(_)));
}

#[tokio::test]
async fn a_node_missing_a_required_input_is_skipped_not_failed() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path());

    let mut settings = FlowSettings::new(1, "test");
    settings.execution_mode = ExecutionMode::Performance;
    let mut graph = FlowGraph::new(1, settings);
    graph.add_node_step(manual_input(1, rows())).unwrap();
    graph
        .add_node_step(NodeSettings::Join(JoinSettings {
            common: CommonSettings::new(1, 2),
            depending_on_id_left: NO_PARENT,
            depending_on_id_right: NO_PARENT,
            left_on: vec!["a".into()],
            right_on: vec!["a".into()],
            how: JoinHow::Inner,
            suffix: "_right".into(),
        }))
        .unwrap();
    graph.connect_node(2, Port::Left, 1).unwrap();

    let info = engine.run(&mut graph, &[2]).await.unwrap();
    assert!(info.success, "a skipped node must not flip the run to failed");
    assert!(graph.node(2).unwrap().result().is_none());
    assert!(info
        .per_node_results
        .iter()
        .any(|r| r.node_id == 2 && r.error.is_some() && r.data_handle.is_none()));
}

#[tokio::test]
async fn a_fully_isolated_node_requiring_input_is_reported_as_skipped() {
    // `filter(2, ...)` keeps its default `depending_on_id = NO_PARENT` and is
    // never connected to anything, so it's unreachable from any start node
    // and `topological_order` never visits it. It must still show up in
    // `per_node_results` rather than vanish from the run entirely.
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path());
    let mut settings = FlowSettings::new(1, "test");
    settings.execution_mode = ExecutionMode::Development;
    let mut graph = FlowGraph::new(1, settings);
    graph.add_node_step(manual_input(1, rows())).unwrap();
    graph.add_node_step(filter(2, "a > 0")).unwrap();

    let info = engine.run(&mut graph, &[]).await.unwrap();
    assert!(info.success, "a skipped node must not flip the run to failed");
    assert!(graph.node(2).unwrap().result().is_none());
    assert!(info
        .per_node_results
        .iter()
        .any(|r| r.node_id == 2 && r.error.as_deref() == Some("skipped, has no input")));
}

#[tokio::test]
async fn a_run_starts_with_a_clean_cancellation_flag() {
    // A stale `is_canceled` from a prior run must not poison the next one:
    // `run()` clears it before dispatching to either scheduler.
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path());
    let mut graph = chain_graph(ExecutionMode::Development);
    graph.cancel();
    assert!(graph.settings.is_canceled);

    let info = engine.run(&mut graph, &[]).await.unwrap();
    assert!(info.success);
    assert!(!graph.settings.is_canceled);
}

#[tokio::test]
async fn running_an_already_running_flow_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path());
    let mut graph = chain_graph(ExecutionMode::Development);
    graph.settings.is_running = true;

    let result = engine.run(&mut graph, &[]).await;
    assert!(result.is_err());
}
