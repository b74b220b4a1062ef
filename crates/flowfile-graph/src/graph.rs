use crate::errors::GraphIntegrityError;
use crate::flow_settings::FlowSettings;
use crate::hash::ParentHash;
use crate::history::{HistoryManager, Op};
use crate::node::FlowNode;
use flowfile_settings::{DependsOn, FlowId, NodeId, NodeSettings, Port, NO_PARENT};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

/// The dataflow graph itself: nodes keyed by id, the flow's own settings,
/// a cache of which nodes currently have zero parents, and the undo/redo
/// log. Edges are not a separate collection — each node's `NodeSettings`
/// carries its own `depending_on_*` fields, so "connecting" a node means
/// writing into that field.
pub struct FlowGraph {
    pub flow_id: FlowId,
    pub settings: FlowSettings,
    nodes: HashMap<NodeId, FlowNode>,
    start_nodes: HashSet<NodeId>,
    history: HistoryManager,
}

impl FlowGraph {
    pub fn new(flow_id: FlowId, settings: FlowSettings) -> Self {
        Self {
            flow_id,
            settings,
            nodes: HashMap::new(),
            start_nodes: HashSet::new(),
            history: HistoryManager::default(),
        }
    }

    pub fn node(&self, node_id: NodeId) -> Option<&FlowNode> {
        self.nodes.get(&node_id)
    }

    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut FlowNode> {
        self.nodes.get_mut(&node_id)
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn start_nodes(&self) -> &HashSet<NodeId> {
        &self.start_nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn cancel(&mut self) {
        self.settings.is_canceled = true;
    }

    /// Drops the undo/redo log without touching any node. Used after
    /// reconstructing a graph from a persisted document, where every node
    /// insertion is really just replaying what was already saved rather
    /// than a mutation a user should be able to undo back to an empty
    /// graph.
    pub fn reset_history(&mut self) {
        self.history = HistoryManager::default();
    }

    // --- Mutation entry points (each commits an `Op`) ---

    pub fn add_node_step(&mut self, settings: NodeSettings) -> Result<NodeId, GraphIntegrityError> {
        let node_id = self.insert_node_internal(settings.clone())?;
        self.history.commit(Op::AddNode { settings });
        Ok(node_id)
    }

    pub fn delete_node(&mut self, node_id: NodeId) -> Result<(), GraphIntegrityError> {
        if !self.nodes.contains_key(&node_id) {
            return Err(GraphIntegrityError::UnknownNode(node_id));
        }
        let dependents = self.dependents_of(node_id);
        let settings = self.remove_node_internal(node_id, &dependents)?;
        self.history.commit(Op::DeleteNode { settings, dependents });
        Ok(())
    }

    pub fn connect_node(&mut self, child: NodeId, port: Port, parent: NodeId) -> Result<(), GraphIntegrityError> {
        self.do_connect(child, port, parent)?;
        self.history.commit(Op::Connect { child, port, parent });
        Ok(())
    }

    pub fn delete_connection(&mut self, child: NodeId, port: Port, parent: NodeId) -> Result<(), GraphIntegrityError> {
        self.do_disconnect(child, port, parent)?;
        self.history.commit(Op::Disconnect { child, port, parent });
        Ok(())
    }

    pub fn copy_node(&mut self, src_node_id: NodeId, new_node_id: NodeId) -> Result<NodeId, GraphIntegrityError> {
        let src = self.nodes.get(&src_node_id).ok_or(GraphIntegrityError::UnknownNode(src_node_id))?;
        let mut cloned = src.settings().clone();
        cloned.common_mut().node_id = new_node_id;
        self.add_node_step(cloned)
    }

    pub fn update_settings(&mut self, node_id: NodeId, new_settings: NodeSettings) -> Result<(), GraphIntegrityError> {
        let before = self
            .nodes
            .get(&node_id)
            .ok_or(GraphIntegrityError::UnknownNode(node_id))?
            .settings()
            .clone();
        let mut after = new_settings;
        after.common_mut().node_id = node_id;
        after.common_mut().flow_id = self.flow_id;
        self.set_settings_silently(node_id, after.clone())?;
        self.history.commit(Op::UpdateSettings { node_id, before, after });
        Ok(())
    }

    pub fn move_node(&mut self, node_id: NodeId, pos_x: f64, pos_y: f64) -> Result<(), GraphIntegrityError> {
        let before = {
            let node = self.nodes.get(&node_id).ok_or(GraphIntegrityError::UnknownNode(node_id))?;
            (node.settings().common().pos_x, node.settings().common().pos_y)
        };
        self.set_pos_silently(node_id, (pos_x, pos_y))?;
        self.history.commit(Op::MoveNode { node_id, before, after: (pos_x, pos_y) });
        Ok(())
    }

    pub fn undo(&mut self) -> Result<bool, GraphIntegrityError> {
        let Some(op) = self.history.take_undo() else { return Ok(false) };
        self.apply_inverse(&op)?;
        self.history.push_redo(op);
        Ok(true)
    }

    pub fn redo(&mut self) -> Result<bool, GraphIntegrityError> {
        let Some(op) = self.history.take_redo() else { return Ok(false) };
        self.apply_forward(&op)?;
        self.history.push_undo(op);
        Ok(true)
    }

    // --- Topology and schema derivation ---

    /// Kahn's algorithm over nodes reachable from `start_nodes`; nodes with
    /// no path from any start are excluded.
    pub fn topological_order(&self) -> Vec<NodeId> {
        let reachable = self.reachable_from_starts();
        let mut in_degree: HashMap<NodeId, usize> = HashMap::new();
        for &id in &reachable {
            let parent_count = self.nodes[&id]
                .settings()
                .depends_on()
                .parent_refs()
                .into_iter()
                .filter(|(pid, _)| reachable.contains(pid))
                .count();
            in_degree.insert(id, parent_count);
        }

        let mut ready: BTreeSet<NodeId> = in_degree.iter().filter(|(_, &c)| c == 0).map(|(&id, _)| id).collect();
        let mut order = Vec::with_capacity(reachable.len());
        while let Some(&next) = ready.iter().next() {
            ready.remove(&next);
            order.push(next);
            for child in self.children_of(next) {
                if !reachable.contains(&child) {
                    continue;
                }
                if let Some(c) = in_degree.get_mut(&child) {
                    *c -= 1;
                    if *c == 0 {
                        ready.insert(child);
                    }
                }
            }
        }
        order
    }

    /// Memoized post-order schema prediction. Each reachable node's
    /// `predict_schema` runs at most once; a node whose upstream schema is
    /// unavailable gets `cached_schema = None` rather than aborting the
    /// whole pass.
    pub fn predict_all_schemas(&mut self) {
        for node_id in self.topological_order() {
            let parent_refs = self.nodes[&node_id].settings().depends_on().parent_refs();
            let mut inputs = Vec::with_capacity(parent_refs.len());
            let mut all_resolved = true;
            for (parent_id, _) in &parent_refs {
                match self.nodes.get(parent_id).and_then(|p| p.cached_schema()) {
                    Some(schema) => inputs.push(schema.clone()),
                    None => {
                        all_resolved = false;
                        break;
                    }
                }
            }
            let node = self.nodes.get_mut(&node_id).expect("node_id from topological_order exists");
            if !all_resolved {
                node.clear_cached_schema();
                continue;
            }
            let _ = node.predict_schema(&inputs);
        }
    }

    // --- Internal helpers ---

    fn insert_node_internal(&mut self, settings: NodeSettings) -> Result<NodeId, GraphIntegrityError> {
        let node_id = settings.node_id();
        if self.nodes.contains_key(&node_id) {
            return Err(GraphIntegrityError::DuplicateNodeId(node_id));
        }
        let node = FlowNode::new(settings);
        let is_start = node.is_start();
        self.nodes.insert(node_id, node);
        if is_start {
            self.start_nodes.insert(node_id);
        }
        self.rehash_and_cascade(node_id);
        Ok(node_id)
    }

    fn remove_node_internal(&mut self, node_id: NodeId, dependents: &[(NodeId, Port)]) -> Result<NodeSettings, GraphIntegrityError> {
        let node = self.nodes.remove(&node_id).ok_or(GraphIntegrityError::UnknownNode(node_id))?;
        self.start_nodes.remove(&node_id);
        let settings = node.settings().clone();
        for (child_id, port) in dependents {
            if let Some(child) = self.nodes.get_mut(child_id) {
                child.settings_mut().clear_parent(*port, node_id);
            }
            self.rehash_and_cascade(*child_id);
            self.refresh_start_status(*child_id);
        }
        Ok(settings)
    }

    fn dependents_of(&self, node_id: NodeId) -> Vec<(NodeId, Port)> {
        self.nodes
            .values()
            .flat_map(|n| {
                n.settings()
                    .depends_on()
                    .parent_refs()
                    .into_iter()
                    .filter(move |(pid, _)| *pid == node_id)
                    .map(move |(_, port)| (n.node_id(), port))
            })
            .collect()
    }

    fn children_of(&self, parent_id: NodeId) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|n| n.settings().depends_on().parent_refs().iter().any(|(pid, _)| *pid == parent_id))
            .map(|n| n.node_id())
            .collect()
    }

    fn is_reachable(&self, source: NodeId, target: NodeId) -> bool {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(source);
        while let Some(cur) = queue.pop_front() {
            for child in self.children_of(cur) {
                if child == target {
                    return true;
                }
                if seen.insert(child) {
                    queue.push_back(child);
                }
            }
        }
        false
    }

    fn reachable_from_starts(&self) -> HashSet<NodeId> {
        let mut seen: HashSet<NodeId> = self.start_nodes.iter().copied().collect();
        let mut queue: VecDeque<NodeId> = self.start_nodes.iter().copied().collect();
        while let Some(cur) = queue.pop_front() {
            for child in self.children_of(cur) {
                if seen.insert(child) {
                    queue.push_back(child);
                }
            }
        }
        seen
    }

    fn parent_hashes_of(&self, node_id: NodeId) -> Vec<ParentHash> {
        let Some(node) = self.nodes.get(&node_id) else { return Vec::new() };
        node.settings()
            .depends_on()
            .parent_refs()
            .into_iter()
            .filter_map(|(pid, port)| self.nodes.get(&pid).map(|p| ParentHash { node_id: pid, port, hash: p.hash() }))
            .collect()
    }

    /// Recomputes `node_id`'s hash against its live parents. If it changed,
    /// resets the node and recurses into its children — a change can only
    /// ripple as far as hashes actually change, which in practice is the
    /// whole downstream subtree (every node's hash embeds its parents').
    fn rehash_and_cascade(&mut self, node_id: NodeId) {
        let parents = self.parent_hashes_of(node_id);
        let changed = match self.nodes.get_mut(&node_id) {
            Some(n) => n.rehash(&parents),
            None => return,
        };
        if changed {
            if let Some(n) = self.nodes.get_mut(&node_id) {
                n.reset();
            }
            for child in self.children_of(node_id) {
                self.rehash_and_cascade(child);
            }
        }
    }

    fn refresh_start_status(&mut self, node_id: NodeId) {
        let Some(node) = self.nodes.get(&node_id) else { return };
        if node.is_start() {
            self.start_nodes.insert(node_id);
        } else {
            self.start_nodes.remove(&node_id);
        }
    }

    fn do_connect(&mut self, child: NodeId, port: Port, parent: NodeId) -> Result<(), GraphIntegrityError> {
        if child == parent {
            return Err(GraphIntegrityError::CycleDetected { from: parent, to: child, port });
        }
        if !self.nodes.contains_key(&parent) {
            return Err(GraphIntegrityError::UnknownNode(parent));
        }
        let child_node = self.nodes.get(&child).ok_or(GraphIntegrityError::UnknownNode(child))?;
        let kind = child_node.kind();

        if self.is_reachable(child, parent) {
            return Err(GraphIntegrityError::CycleDetected { from: parent, to: child, port });
        }

        let occupied = match child_node.settings().depends_on() {
            DependsOn::Single(p) => p != NO_PARENT,
            DependsOn::TwoInput { left, right } => match port {
                Port::Left => left != NO_PARENT,
                Port::Right => right != NO_PARENT,
                Port::Main => false,
            },
            DependsOn::Multi(_) | DependsOn::None => false,
        };
        if occupied {
            return Err(GraphIntegrityError::PortOccupied { node_id: child, port });
        }

        let child_node = self.nodes.get_mut(&child).expect("checked above");
        if !child_node.settings_mut().set_parent(port, parent) {
            return Err(GraphIntegrityError::InvalidPort { kind: kind.as_str(), port });
        }
        self.rehash_and_cascade(child);
        self.refresh_start_status(child);
        Ok(())
    }

    fn do_disconnect(&mut self, child: NodeId, port: Port, parent: NodeId) -> Result<(), GraphIntegrityError> {
        let child_node = self.nodes.get_mut(&child).ok_or(GraphIntegrityError::UnknownNode(child))?;
        let exists = child_node
            .settings()
            .depends_on()
            .parent_refs()
            .into_iter()
            .any(|(pid, p)| pid == parent && p == port);
        if !exists {
            return Err(GraphIntegrityError::NoSuchConnection(child, port));
        }
        child_node.settings_mut().clear_parent(port, parent);
        self.rehash_and_cascade(child);
        self.refresh_start_status(child);
        Ok(())
    }

    fn set_settings_silently(&mut self, node_id: NodeId, new_settings: NodeSettings) -> Result<(), GraphIntegrityError> {
        let node = self.nodes.get_mut(&node_id).ok_or(GraphIntegrityError::UnknownNode(node_id))?;
        *node.settings_mut() = new_settings;
        self.rehash_and_cascade(node_id);
        self.refresh_start_status(node_id);
        Ok(())
    }

    fn set_pos_silently(&mut self, node_id: NodeId, pos: (f64, f64)) -> Result<(), GraphIntegrityError> {
        let node = self.nodes.get_mut(&node_id).ok_or(GraphIntegrityError::UnknownNode(node_id))?;
        node.settings_mut().common_mut().pos_x = pos.0;
        node.settings_mut().common_mut().pos_y = pos.1;
        Ok(())
    }

    fn apply_forward(&mut self, op: &Op) -> Result<(), GraphIntegrityError> {
        match op {
            Op::AddNode { settings } => {
                self.insert_node_internal(settings.clone())?;
            }
            Op::DeleteNode { settings, dependents } => {
                self.remove_node_internal(settings.node_id(), dependents)?;
            }
            Op::Connect { child, port, parent } => self.do_connect(*child, *port, *parent)?,
            Op::Disconnect { child, port, parent } => self.do_disconnect(*child, *port, *parent)?,
            Op::UpdateSettings { node_id, after, .. } => self.set_settings_silently(*node_id, after.clone())?,
            Op::MoveNode { node_id, after, .. } => self.set_pos_silently(*node_id, *after)?,
        }
        Ok(())
    }

    fn apply_inverse(&mut self, op: &Op) -> Result<(), GraphIntegrityError> {
        match op {
            Op::AddNode { settings } => {
                self.remove_node_internal(settings.node_id(), &[])?;
            }
            Op::DeleteNode { settings, dependents } => {
                self.insert_node_internal(settings.clone())?;
                for (child_id, port) in dependents {
                    if let Some(child) = self.nodes.get_mut(child_id) {
                        child.settings_mut().set_parent(*port, settings.node_id());
                    }
                    self.rehash_and_cascade(*child_id);
                    self.refresh_start_status(*child_id);
                }
            }
            Op::Connect { child, port, parent } => self.do_disconnect(*child, *port, *parent)?,
            Op::Disconnect { child, port, parent } => self.do_connect(*child, *port, *parent)?,
            Op::UpdateSettings { node_id, before, .. } => self.set_settings_silently(*node_id, before.clone())?,
            Op::MoveNode { node_id, before, .. } => self.set_pos_silently(*node_id, *before)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowfile_settings::{CommonSettings, FilterSettings, JoinHow, JoinSettings, ManualInputSettings};
    use std::collections::HashMap as StdHashMap;

    fn graph() -> FlowGraph {
        FlowGraph::new(1, FlowSettings::new(1, "test"))
    }

    fn manual_input(node_id: i64) -> NodeSettings {
        NodeSettings::ManualInput(ManualInputSettings {
            common: CommonSettings::new(1, node_id),
            rows: vec![StdHashMap::from([("a".to_string(), serde_json::json!(1))])],
        })
    }

    fn filter(node_id: i64) -> NodeSettings {
        NodeSettings::Filter(FilterSettings {
            common: CommonSettings::new(1, node_id),
            depending_on_id: NO_PARENT,
            predicate: "a > 0".into(),
        })
    }

    #[test]
    fn add_and_connect_updates_start_nodes() {
        let mut g = graph();
        g.add_node_step(manual_input(1)).unwrap();
        g.add_node_step(filter(2)).unwrap();
        assert!(g.start_nodes().contains(&1));
        assert!(g.start_nodes().contains(&2));

        g.connect_node(2, Port::Main, 1).unwrap();
        assert!(!g.start_nodes().contains(&2));
        assert_eq!(g.topological_order(), vec![1, 2]);
    }

    #[test]
    fn connecting_a_cycle_is_rejected() {
        let mut g = graph();
        g.add_node_step(manual_input(1)).unwrap();
        g.add_node_step(filter(2)).unwrap();
        g.connect_node(2, Port::Main, 1).unwrap();

        let err = g.connect_node(1, Port::Main, 2).unwrap_err();
        assert!(matches!(err, GraphIntegrityError::CycleDetected { .. }));
    }

    #[test]
    fn delete_node_unlinks_dependents() {
        let mut g = graph();
        g.add_node_step(manual_input(1)).unwrap();
        g.add_node_step(filter(2)).unwrap();
        g.connect_node(2, Port::Main, 1).unwrap();

        g.delete_node(1).unwrap();
        assert!(g.start_nodes().contains(&2));
        assert_eq!(g.node(2).unwrap().settings().depends_on(), DependsOn::Single(NO_PARENT));
    }

    #[test]
    fn undo_restores_deleted_node_and_its_edge() {
        let mut g = graph();
        g.add_node_step(manual_input(1)).unwrap();
        g.add_node_step(filter(2)).unwrap();
        g.connect_node(2, Port::Main, 1).unwrap();

        g.delete_node(1).unwrap();
        assert!(g.node(1).is_none());

        assert!(g.undo().unwrap());
        assert!(g.node(1).is_some());
        assert_eq!(g.node(2).unwrap().settings().depends_on(), DependsOn::Single(1));
    }

    #[test]
    fn settings_update_propagates_needs_reset_to_descendants() {
        let mut g = graph();
        g.add_node_step(manual_input(1)).unwrap();
        g.add_node_step(filter(2)).unwrap();
        g.add_node_step(filter(3)).unwrap();
        g.connect_node(2, Port::Main, 1).unwrap();
        g.connect_node(3, Port::Main, 2).unwrap();
        for id in [1, 2, 3] {
            g.node_mut(id).unwrap().reset();
        }

        let mut changed = match g.node(2).unwrap().settings().clone() {
            NodeSettings::Filter(s) => s,
            _ => unreachable!(),
        };
        changed.predicate = "a > 100".into();
        g.update_settings(2, NodeSettings::Filter(changed)).unwrap();

        assert!(g.node(2).unwrap().needs_reset_now());
        assert!(g.node(2).unwrap().cached_schema().is_none());
        assert!(g.node(3).unwrap().needs_reset_now());
        assert!(g.node(3).unwrap().cached_schema().is_none());
        assert!(!g.node(1).unwrap().needs_reset_now());
    }

    #[test]
    fn join_requires_both_ports_before_occupied_error() {
        let mut g = graph();
        g.add_node_step(manual_input(1)).unwrap();
        g.add_node_step(manual_input(2)).unwrap();
        g.add_node_step(NodeSettings::Join(JoinSettings {
            common: CommonSettings::new(1, 3),
            depending_on_id_left: NO_PARENT,
            depending_on_id_right: NO_PARENT,
            left_on: vec!["a".into()],
            right_on: vec!["a".into()],
            how: JoinHow::Inner,
            suffix: "_right".into(),
        }))
        .unwrap();

        g.connect_node(3, Port::Left, 1).unwrap();
        g.connect_node(3, Port::Right, 2).unwrap();
        let err = g.connect_node(3, Port::Left, 2).unwrap_err();
        assert!(matches!(err, GraphIntegrityError::PortOccupied { .. }));
    }
}
