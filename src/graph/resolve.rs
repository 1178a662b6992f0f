use std::collections::HashSet;

use crate::{
    foundation::core::{NodeId, PortId},
    graph::{links::LinkTable, store::NodeStore},
};

/// Ordered execution chain derived from the link table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chain {
    /// Node ids starting at Input, following outgoing links.
    pub nodes: Vec<NodeId>,
    /// Whether the walk ended on the Output node.
    pub complete: bool,
}

impl Chain {
    /// Nodes strictly between Input and Output, in evaluation order.
    ///
    /// Empty for an incomplete chain.
    pub fn intermediate(&self) -> &[NodeId] {
        if !self.complete || self.nodes.len() < 2 {
            return &[];
        }
        &self.nodes[1..self.nodes.len() - 1]
    }
}

/// Walk from the Input node along outgoing links until none is left.
///
/// A link pointing at a node that is no longer live ends the walk, as does reaching Output.
/// Revisiting a node means the wiring contains a cycle; the walk stops there and the chain
/// is reported incomplete.
#[tracing::instrument(level = "debug", skip_all)]
pub fn resolve(nodes: &NodeStore, links: &LinkTable) -> Chain {
    let input = nodes.input();
    let output = nodes.output();

    let mut chain = vec![input];
    let mut seen = HashSet::from([input]);
    let mut tail = input;
    while tail != output {
        let Some(link) = links.from_source(PortId::output(tail)) else {
            break;
        };
        let next = link.target.node;
        if !nodes.contains(next) {
            tracing::warn!(link = %link.id, node = %next, "link targets a missing node");
            break;
        }
        if !seen.insert(next) {
            tracing::warn!(node = %next, "cycle in links, stopping chain walk");
            return Chain {
                nodes: chain,
                complete: false,
            };
        }
        chain.push(next);
        tail = next;
    }

    let complete = tail == output;
    tracing::debug!(len = chain.len(), complete, "resolved chain");
    Chain {
        nodes: chain,
        complete,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/resolve.rs"]
mod tests;
