use crate::error::PersistenceError;
use flowfile_graph::{FlowGraph, FlowSettings};
use flowfile_settings::NodeSettings;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;

/// The persisted shape of a flow. Node records already carry their own
/// position, description, `cache_results`, and dependency edges inside
/// `NodeSettings` (the Settings Catalog's `common` block and each variant's
/// `depending_on_*` fields) — there is no separate edge list to keep in
/// sync, since the settings payload already is the edge list. Schemas and
/// cached results are deliberately absent: loading always re-derives them.
#[derive(Serialize, Deserialize)]
pub struct FlowDocument {
    pub settings: FlowSettings,
    pub nodes: Vec<NodeSettings>,
}

impl FlowDocument {
    pub fn from_graph(graph: &FlowGraph) -> Self {
        let mut nodes: Vec<NodeSettings> = graph.node_ids().filter_map(|id| graph.node(id).map(|n| n.settings().clone())).collect();
        nodes.sort_by_key(|s| s.node_id());
        Self {
            settings: graph.settings.clone(),
            nodes,
        }
    }

    /// Rebuilds a `FlowGraph`, inserting nodes in dependency order so each
    /// one's content hash is computed against parents that already exist —
    /// `FlowGraph::add_node_step` only folds in a parent's hash if that
    /// parent is already present, so an out-of-order load would silently
    /// leave some hashes short a contribution. History starts empty: a
    /// freshly loaded flow has nothing to undo back past.
    pub fn into_graph(self) -> Result<FlowGraph, PersistenceError> {
        let mut graph = FlowGraph::new(self.settings.flow_id, self.settings);
        for settings in topological(self.nodes)? {
            graph.add_node_step(settings)?;
        }
        graph.reset_history();
        graph.predict_all_schemas();
        Ok(graph)
    }
}

/// Kahn's algorithm over the stored `depending_on_*` references, so
/// `into_graph` can insert parents before their children regardless of
/// the order nodes happen to appear in the document.
fn topological(nodes: Vec<NodeSettings>) -> Result<Vec<NodeSettings>, PersistenceError> {
    let by_id: HashMap<i64, NodeSettings> = nodes.into_iter().map(|s| (s.node_id(), s)).collect();
    let mut in_degree: HashMap<i64, usize> = HashMap::new();
    let mut children: HashMap<i64, Vec<i64>> = HashMap::new();

    for (id, settings) in &by_id {
        let parents = settings.depends_on().parent_refs();
        in_degree.entry(*id).or_insert(0);
        for (parent_id, _) in parents {
            if by_id.contains_key(&parent_id) {
                *in_degree.entry(*id).or_insert(0) += 1;
                children.entry(parent_id).or_default().push(*id);
            }
        }
    }

    let mut ready: VecDeque<i64> = in_degree.iter().filter(|(_, &c)| c == 0).map(|(&id, _)| id).collect();
    let mut order = Vec::with_capacity(by_id.len());
    let mut visited = HashSet::new();
    while let Some(id) = ready.pop_front() {
        if !visited.insert(id) {
            continue;
        }
        order.push(id);
        for &child in children.get(&id).into_iter().flatten() {
            if let Some(c) = in_degree.get_mut(&child) {
                *c -= 1;
                if *c == 0 {
                    ready.push_back(child);
                }
            }
        }
    }

    if order.len() != by_id.len() {
        return Err(PersistenceError::Format("node dependency graph contains a cycle".to_string()));
    }

    let mut by_id = by_id;
    Ok(order.into_iter().filter_map(|id| by_id.remove(&id)).collect())
}

/// Detects format from the file extension: `.json` is read/written as
/// JSON, anything else (`.yaml`, `.yml`, no extension) as YAML, matching
/// spec's "YAML or JSON" without forcing a single canonical choice.
fn is_json(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()).map(|e| e.eq_ignore_ascii_case("json")).unwrap_or(false)
}

pub fn save_graph(graph: &FlowGraph, path: &Path) -> Result<(), PersistenceError> {
    let doc = FlowDocument::from_graph(graph);
    let tmp_path = path.with_extension("tmp");
    let serialized = if is_json(path) {
        serde_json::to_string_pretty(&doc).map_err(|e| PersistenceError::Format(e.to_string()))?
    } else {
        serde_yaml::to_string(&doc).map_err(|e| PersistenceError::Format(e.to_string()))?
    };
    std::fs::write(&tmp_path, serialized)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

pub fn load_graph(path: &Path) -> Result<FlowGraph, PersistenceError> {
    let contents = std::fs::read_to_string(path)?;
    let doc: FlowDocument = if is_json(path) {
        serde_json::from_str(&contents).map_err(|e| PersistenceError::Format(e.to_string()))?
    } else {
        serde_yaml::from_str(&contents).map_err(|e| PersistenceError::Format(e.to_string()))?
    };
    doc.into_graph()
}
