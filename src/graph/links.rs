use std::collections::{BTreeMap, HashMap};

use crate::foundation::core::{LinkId, NodeId, PortDir, PortId};
use crate::foundation::error::{ChainError, ChainResult};

/// Directed edge from an output port to an input port.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Link {
    /// Assigned once at creation.
    pub id: LinkId,
    /// Always an output port.
    pub source: PortId,
    /// Always an input port.
    pub target: PortId,
}

impl Link {
    /// Whether either endpoint belongs to `node`.
    pub fn touches(&self, node: NodeId) -> bool {
        self.source.node == node || self.target.node == node
    }
}

/// Result of [`LinkTable::connect`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Connected {
    /// The new link.
    pub link: Link,
    /// Link that previously left the same source port, now removed.
    pub replaced: Option<Link>,
}

/// Every link of one editor session, indexed by id and by source port.
///
/// A source port drives at most one link; connecting it again retires the previous link.
#[derive(Clone, Debug, Default)]
pub struct LinkTable {
    links: BTreeMap<LinkId, Link>,
    by_source: HashMap<PortId, LinkId>,
    next_id: u64,
}

impl LinkTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    fn check_ports(source: PortId, target: PortId) -> ChainResult<()> {
        if source.dir != PortDir::Out {
            return Err(ChainError::validation(format!(
                "link source {source} must be an output port"
            )));
        }
        if target.dir != PortDir::In {
            return Err(ChainError::validation(format!(
                "link target {target} must be an input port"
            )));
        }
        if source.node == target.node {
            return Err(ChainError::validation(format!(
                "cannot link {} to itself",
                source.node
            )));
        }
        Ok(())
    }

    /// Connect `source` to `target`, retiring any link already leaving `source`.
    pub fn connect(&mut self, source: PortId, target: PortId) -> ChainResult<Connected> {
        Self::check_ports(source, target)?;
        let replaced = match self.by_source.get(&source).copied() {
            Some(old) => self.remove(old),
            None => None,
        };
        let link = Link {
            id: LinkId(self.next_id),
            source,
            target,
        };
        self.next_id += 1;
        self.links.insert(link.id, link);
        self.by_source.insert(source, link.id);
        Ok(Connected { link, replaced })
    }

    /// Re-insert a link under its recorded id.
    ///
    /// Fails when the id is live or the source port is already driving another link.
    pub fn insert_with_id(&mut self, link: Link) -> ChainResult<()> {
        Self::check_ports(link.source, link.target)?;
        if self.links.contains_key(&link.id) {
            return Err(ChainError::history_replay(format!(
                "{} is already live",
                link.id
            )));
        }
        if let Some(other) = self.by_source.get(&link.source) {
            return Err(ChainError::history_replay(format!(
                "source {} already drives {other}",
                link.source
            )));
        }
        self.next_id = self.next_id.max(link.id.0 + 1);
        self.links.insert(link.id, link);
        self.by_source.insert(link.source, link.id);
        Ok(())
    }

    /// Remove a link; unknown ids are a no-op and yield `None`.
    pub fn remove(&mut self, id: LinkId) -> Option<Link> {
        let link = self.links.remove(&id)?;
        if self.by_source.get(&link.source) == Some(&id) {
            self.by_source.remove(&link.source);
        }
        Some(link)
    }

    /// Remove every link touching `node`, returned in id order.
    pub fn remove_incident(&mut self, node: NodeId) -> Vec<Link> {
        let ids: Vec<LinkId> = self
            .links
            .values()
            .filter(|l| l.touches(node))
            .map(|l| l.id)
            .collect();
        ids.into_iter().filter_map(|id| self.remove(id)).collect()
    }

    /// Link leaving `source`, if any.
    pub fn from_source(&self, source: PortId) -> Option<&Link> {
        self.by_source.get(&source).and_then(|id| self.links.get(id))
    }

    /// Link by id.
    pub fn get(&self, id: LinkId) -> ChainResult<&Link> {
        self.links
            .get(&id)
            .ok_or_else(|| ChainError::not_found(id.to_string()))
    }

    /// All links in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    /// Number of links.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Whether the table holds no links.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Drop every link. Id allocation continues where it left off.
    pub fn clear(&mut self) {
        self.links.clear();
        self.by_source.clear();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/links.rs"]
mod tests;
