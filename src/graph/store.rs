use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use crate::{
    catalog::{
        kind::{KindRole, NodeKind},
        params::Params,
    },
    foundation::core::{NodeId, Point},
    foundation::error::{ChainError, ChainResult},
};

/// A live node on the canvas.
#[derive(Clone, Debug)]
pub struct NodeInstance {
    /// Stable identity, never reused.
    pub id: NodeId,
    /// Display label, `"{kind}_{counter}"`.
    pub label: String,
    /// Kind the instance was created from.
    pub kind: Arc<NodeKind>,
    /// Current parameter values, independent per instance.
    pub params: Params,
    /// Canvas position; cosmetic only.
    pub position: Point,
}

impl NodeInstance {
    /// Whether the instance may be deleted or duplicated.
    pub fn is_protected(&self) -> bool {
        self.kind.protected
    }

    /// Full copy of the instance's identity and state.
    pub fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            id: self.id,
            label: self.label.clone(),
            kind: self.kind.clone(),
            params: self.params.clone(),
            position: self.position,
        }
    }
}

/// Everything needed to re-insert a node verbatim.
#[derive(Clone, Debug)]
pub struct NodeSnapshot {
    /// Identity to restore.
    pub id: NodeId,
    /// Display label to restore.
    pub label: String,
    /// Kind of the node.
    pub kind: Arc<NodeKind>,
    /// Parameter values at snapshot time.
    pub params: Params,
    /// Canvas position at snapshot time.
    pub position: Point,
}

impl PartialEq for NodeSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.label == other.label
            && self.kind.name == other.kind.name
            && self.params == other.params
            && self.position == other.position
    }
}

/// Owner of every live node instance of one editor session.
///
/// Always holds exactly one Input and one Output instance; both are created with the
/// store and can never be removed.
#[derive(Clone, Debug)]
pub struct NodeStore {
    nodes: BTreeMap<NodeId, NodeInstance>,
    next_id: u64,
    counters: HashMap<String, u64>,
    input: NodeId,
    output: NodeId,
}

impl NodeStore {
    /// New store holding the Input and Output instances.
    pub fn new(input_kind: Arc<NodeKind>, output_kind: Arc<NodeKind>) -> ChainResult<Self> {
        if input_kind.role != KindRole::Input || output_kind.role != KindRole::Output {
            return Err(ChainError::validation(
                "node store needs an Input and an Output kind",
            ));
        }
        let mut store = Self {
            nodes: BTreeMap::new(),
            next_id: 0,
            counters: HashMap::new(),
            input: NodeId(0),
            output: NodeId(0),
        };
        store.input = store.create(input_kind, Params::default(), Point::new(20.0, 20.0));
        store.output = store.create(output_kind, Params::default(), Point::new(700.0, 20.0));
        Ok(store)
    }

    /// Id of the Input instance.
    pub fn input(&self) -> NodeId {
        self.input
    }

    /// Id of the Output instance.
    pub fn output(&self) -> NodeId {
        self.output
    }

    /// Allocate a fresh id and per-kind label, and register the instance.
    pub fn create(&mut self, kind: Arc<NodeKind>, params: Params, position: Point) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;

        let prefix = kind.label_prefix();
        let counter = self.counters.entry(prefix.clone()).or_insert(0);
        let label = format!("{prefix}_{counter}");
        *counter += 1;

        self.nodes.insert(
            id,
            NodeInstance {
                id,
                label,
                kind,
                params,
                position,
            },
        );
        id
    }

    /// Re-insert a previously removed node with its recorded identity.
    ///
    /// Fails when the id is already live; the caller treats that as a diverged history.
    pub fn restore(&mut self, snapshot: NodeSnapshot) -> ChainResult<()> {
        if self.nodes.contains_key(&snapshot.id) {
            return Err(ChainError::history_replay(format!(
                "cannot restore '{}': {} is already live",
                snapshot.label, snapshot.id
            )));
        }
        // Ids handed out later must stay unique even if the snapshot came from elsewhere.
        self.next_id = self.next_id.max(snapshot.id.0 + 1);
        self.nodes.insert(
            snapshot.id,
            NodeInstance {
                id: snapshot.id,
                label: snapshot.label,
                kind: snapshot.kind,
                params: snapshot.params,
                position: snapshot.position,
            },
        );
        Ok(())
    }

    /// Remove a non-protected node. Links are the caller's to prune.
    pub fn destroy(&mut self, id: NodeId) -> ChainResult<NodeInstance> {
        let node = self.get(id)?;
        if node.is_protected() {
            return Err(ChainError::protected(node.label.clone()));
        }
        self.nodes
            .remove(&id)
            .ok_or_else(|| ChainError::not_found(id.to_string()))
    }

    /// Remove any node other than Input and Output, ignoring the kind's protection flag.
    ///
    /// History replay removes nodes through here; protection only guards user deletes.
    pub(crate) fn remove_for_replay(&mut self, id: NodeId) -> ChainResult<NodeInstance> {
        if id == self.input || id == self.output {
            return Err(ChainError::history_replay(format!(
                "{id} is a fixed endpoint and cannot be removed"
            )));
        }
        self.nodes
            .remove(&id)
            .ok_or_else(|| ChainError::history_replay(format!("{id} is not live")))
    }

    /// Node by id.
    pub fn get(&self, id: NodeId) -> ChainResult<&NodeInstance> {
        self.nodes
            .get(&id)
            .ok_or_else(|| ChainError::not_found(id.to_string()))
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> ChainResult<&mut NodeInstance> {
        self.nodes
            .get_mut(&id)
            .ok_or_else(|| ChainError::not_found(id.to_string()))
    }

    /// Whether `id` is live.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Node by display label.
    pub fn find_by_label(&self, label: &str) -> Option<&NodeInstance> {
        self.nodes.values().find(|n| n.label == label)
    }

    /// All live nodes in id order.
    pub fn iter(&self) -> impl Iterator<Item = &NodeInstance> {
        self.nodes.values()
    }

    /// Number of live nodes, Input and Output included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Never true: Input and Output are always present.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/store.rs"]
mod tests;
