//! A headless walk through building, running, and undoing a small pipeline:
//! read rows in, drop the negative ones, sum by group, write the result.
//! Mirrors the shape a UI would produce through the same `FlowGraph` calls.

use flowfile_core::{Flowfile, FlowfileConfig};
use flowfile_graph::{ExecutionMode, FlowGraph, FlowSettings};
use flowfile_settings::{
    Aggregation, AggFunc, CommonSettings, FileFormat, FilterSettings, GroupBySettings, ManualInputSettings, NodeSettings, OutputSettings,
    Port, WriteMode, NO_PARENT,
};
use std::collections::HashMap;

fn row(a: i64, b: &str) -> HashMap<String, serde_json::Value> {
    HashMap::from([("a".to_string(), serde_json::json!(a)), ("b".to_string(), serde_json::json!(b))])
}

#[tokio::main]
async fn main() {
    flowfile_core::init_tracing();
    println!("=== flowfile basic pipeline demo ===");

    // 1. Build the flow.
    let mut settings = FlowSettings::new(1, "basic_pipeline");
    settings.execution_mode = ExecutionMode::Development;
    let mut graph = FlowGraph::new(1, settings);

    let input_id = graph
        .add_node_step(NodeSettings::ManualInput(ManualInputSettings {
            common: CommonSettings::new(1, 1),
            rows: vec![row(1, "x"), row(2, "y"), row(-1, "x")],
        }))
        .unwrap();
    println!("1. added manual_input node {input_id} with 3 rows");

    let filter_id = graph
        .add_node_step(NodeSettings::Filter(FilterSettings {
            common: CommonSettings::new(1, 2),
            depending_on_id: NO_PARENT,
            predicate: "a > 0".to_string(),
        }))
        .unwrap();
    graph.connect_node(filter_id, Port::Main, input_id).unwrap();
    println!("2. added filter node {filter_id}, connected to {input_id}");

    let group_id = graph
        .add_node_step(NodeSettings::GroupBy(GroupBySettings {
            common: CommonSettings::new(1, 3),
            depending_on_id: NO_PARENT,
            group_by_columns: vec!["b".to_string()],
            aggregations: vec![Aggregation {
                column: "a".to_string(),
                agg: AggFunc::Sum,
                output_column: "a_sum".to_string(),
            }],
        }))
        .unwrap();
    graph.connect_node(group_id, Port::Main, filter_id).unwrap();
    println!("3. added group_by node {group_id}, connected to {filter_id}");

    let output_id = graph
        .add_node_step(NodeSettings::Output(OutputSettings {
            common: CommonSettings::new(1, 4),
            depending_on_id: NO_PARENT,
            path: "demo_output.parquet".to_string(),
            file_format: FileFormat::Parquet,
            write_mode: WriteMode::Overwrite,
        }))
        .unwrap();
    graph.connect_node(output_id, Port::Main, group_id).unwrap();
    println!("4. added output node {output_id}, connected to {group_id}");

    // 2. Run it.
    let cache_dir = std::env::temp_dir().join("flowfile-basic-pipeline-demo");
    let mut config = FlowfileConfig::default();
    config.cache_root = cache_dir;
    let flowfile = Flowfile::new(config);

    let info = flowfile.run(&mut graph, &[]).await.unwrap();
    println!("5. ran the flow: success={}, nodes_completed={}", info.success, info.nodes_completed);

    let grouped = graph.node(group_id).unwrap().result().unwrap();
    println!("   group_by node sampled {:?} rows", grouped.row_count);

    // 3. Undo the filter's predicate, rerun, observe the row count change.
    graph
        .update_settings(
            filter_id,
            NodeSettings::Filter(FilterSettings {
                common: CommonSettings::new(1, 2),
                depending_on_id: NO_PARENT,
                predicate: "a > -10".to_string(),
            }),
        )
        .unwrap();
    println!("6. widened the filter predicate to a > -10");
    flowfile.run(&mut graph, &[]).await.unwrap();
    let widened = graph.node(filter_id).unwrap().result().unwrap();
    println!("   filter node now keeps {:?} rows", widened.row_count);

    let undone = graph.undo().unwrap();
    println!("7. undo() reverted the predicate change: {undone}");

    // 4. Save and reload the flow document.
    let doc_path = std::env::temp_dir().join("flowfile-basic-pipeline-demo.json");
    flowfile.save(&graph, &doc_path).unwrap();
    let reloaded = flowfile.load(&doc_path).unwrap();
    println!("8. saved to {} and reloaded {} nodes", doc_path.display(), reloaded.len());
}
