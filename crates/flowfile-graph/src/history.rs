use flowfile_settings::{NodeId, NodeSettings, Port};

/// A reversible record of one graph mutation. `apply_forward`/`apply_inverse`
/// on `FlowGraph` interpret these; the history module itself only manages
/// the stacks.
#[derive(Clone)]
pub enum Op {
    AddNode {
        settings: NodeSettings,
    },
    DeleteNode {
        settings: NodeSettings,
        /// `(child, port)` pairs that pointed at this node before it was
        /// removed, so undo can rewire them back.
        dependents: Vec<(NodeId, Port)>,
    },
    Connect {
        child: NodeId,
        port: Port,
        parent: NodeId,
    },
    Disconnect {
        child: NodeId,
        port: Port,
        parent: NodeId,
    },
    UpdateSettings {
        node_id: NodeId,
        before: NodeSettings,
        after: NodeSettings,
    },
    MoveNode {
        node_id: NodeId,
        before: (f64, f64),
        after: (f64, f64),
    },
}

/// Undo/redo stacks of reversible `Op`s. Any freshly committed op clears
/// the redo stack — once the timeline branches, the old future is gone.
pub struct HistoryManager {
    undo_stack: Vec<Op>,
    redo_stack: Vec<Op>,
    pub max_history: usize,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(100)
    }
}

impl HistoryManager {
    pub fn new(max_history: usize) -> Self {
        Self {
            undo_stack: Vec::with_capacity(max_history),
            redo_stack: Vec::new(),
            max_history,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Records a newly-performed mutation.
    pub fn commit(&mut self, op: Op) {
        if self.undo_stack.len() >= self.max_history {
            self.undo_stack.remove(0); // Drop oldest
        }
        self.undo_stack.push(op);
        self.redo_stack.clear();
    }

    pub fn take_undo(&mut self) -> Option<Op> {
        self.undo_stack.pop()
    }

    pub fn take_redo(&mut self) -> Option<Op> {
        self.redo_stack.pop()
    }

    pub fn push_redo(&mut self, op: Op) {
        self.redo_stack.push(op);
    }

    pub fn push_undo(&mut self, op: Op) {
        if self.undo_stack.len() >= self.max_history {
            self.undo_stack.remove(0);
        }
        self.undo_stack.push(op);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowfile_settings::{CommonSettings, FilterSettings};

    fn op(node_id: i64) -> Op {
        Op::AddNode {
            settings: NodeSettings::Filter(FilterSettings {
                common: CommonSettings::new(1, node_id),
                depending_on_id: 0,
                predicate: "x > 1".into(),
            }),
        }
    }

    #[test]
    fn commit_clears_redo_stack() {
        let mut history = HistoryManager::new(10);
        history.push_redo(op(1));
        assert!(history.can_redo());
        history.commit(op(2));
        assert!(!history.can_redo());
    }

    #[test]
    fn bounded_depth_evicts_oldest() {
        let mut history = HistoryManager::new(2);
        history.commit(op(1));
        history.commit(op(2));
        history.commit(op(3));
        assert_eq!(history.undo_stack.len(), 2);
    }
}
