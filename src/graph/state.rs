use crate::{
    catalog::{kind::KindRole, params::ParamValue},
    foundation::core::{LinkId, NodeId, PortDir, PortId},
    foundation::error::{ChainError, ChainResult},
    graph::{
        links::{Connected, Link, LinkTable},
        resolve::{Chain, resolve},
        store::{NodeInstance, NodeSnapshot, NodeStore},
    },
    history::manager::Replay,
};

/// Node store and link table of one session, kept consistent with each other.
#[derive(Clone, Debug)]
pub struct Graph {
    pub(crate) nodes: NodeStore,
    pub(crate) links: LinkTable,
}

impl Graph {
    /// Graph over `nodes` with no links yet.
    pub fn new(nodes: NodeStore) -> Self {
        Self {
            nodes,
            links: LinkTable::new(),
        }
    }

    /// Live nodes.
    pub fn nodes(&self) -> &NodeStore {
        &self.nodes
    }

    /// Live links.
    pub fn links(&self) -> &LinkTable {
        &self.links
    }

    /// Current execution chain from Input.
    pub fn resolve(&self) -> Chain {
        resolve(&self.nodes, &self.links)
    }

    /// Check that `port` exists on a live node.
    ///
    /// Input has no input port and Output has no output port.
    fn check_port(&self, port: PortId) -> ChainResult<()> {
        let node = self.nodes.get(port.node)?;
        let missing = match (node.kind.role, port.dir) {
            (KindRole::Input, PortDir::In) => Some("input"),
            (KindRole::Output, PortDir::Out) => Some("output"),
            _ => None,
        };
        if let Some(side) = missing {
            return Err(ChainError::validation(format!(
                "'{}' has no {side} port",
                node.label
            )));
        }
        Ok(())
    }

    /// Connect two ports of live nodes.
    pub fn connect(&mut self, source: PortId, target: PortId) -> ChainResult<Connected> {
        self.check_port(source)?;
        self.check_port(target)?;
        self.links.connect(source, target)
    }

    /// Remove a node and every link touching it.
    pub fn delete_node(&mut self, id: NodeId) -> ChainResult<(NodeInstance, Vec<Link>)> {
        let node = self.nodes.destroy(id)?;
        let links = self.links.remove_incident(id);
        tracing::debug!(node = %node.label, links = links.len(), "deleted node");
        Ok((node, links))
    }

    /// Store a new value for an existing parameter, returning the old one.
    pub fn replace_param(
        &mut self,
        id: NodeId,
        key: &str,
        value: ParamValue,
    ) -> ChainResult<ParamValue> {
        let node = self.nodes.get_mut(id)?;
        match node.params.replace(key, value) {
            Some(old) => Ok(old),
            None => Err(ChainError::unknown_parameter(node.label.clone(), key)),
        }
    }
}

impl Replay for Graph {
    fn restore_node(&mut self, node: &NodeSnapshot) -> ChainResult<()> {
        self.nodes.restore(node.clone())
    }

    fn remove_node(&mut self, id: NodeId) -> ChainResult<NodeSnapshot> {
        let node = self.nodes.remove_for_replay(id)?;
        let links = self.links.remove_incident(id);
        tracing::debug!(node = %node.label, links = links.len(), "replay removed node");
        Ok(node.snapshot())
    }

    fn write_param(&mut self, id: NodeId, key: &str, value: &ParamValue) -> ChainResult<()> {
        self.replace_param(id, key, value.clone()).map(|_| ())
    }

    fn restore_link(&mut self, link: &Link) -> ChainResult<()> {
        if !self.nodes.contains(link.source.node) || !self.nodes.contains(link.target.node) {
            return Err(ChainError::history_replay(format!(
                "{} references a node that is not live",
                link.id
            )));
        }
        self.links.insert_with_id(*link)
    }

    fn remove_link(&mut self, id: LinkId) -> ChainResult<()> {
        self.links.remove(id).map(|_| ()).ok_or_else(|| {
            ChainError::history_replay(format!("{id} is not live"))
        })
    }
}
