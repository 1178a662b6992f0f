use std::fmt;

use crate::{
    catalog::params::ParamValue,
    foundation::core::NodeId,
    graph::{links::Link, store::NodeSnapshot},
};

/// One recorded mutation, with everything needed to apply it in either direction.
#[derive(Clone, Debug, PartialEq)]
pub enum HistoryAction {
    /// A node was added. The snapshot is refreshed with the node's final position on undo.
    NodeCreated(NodeSnapshot),
    /// A node was removed together with the links that touched it.
    NodeDeleted {
        /// State of the node right before removal.
        node: NodeSnapshot,
        /// Links removed by the cascade, in id order.
        links: Vec<Link>,
    },
    /// One parameter changed value.
    ParamUpdated {
        /// Subject node.
        node: NodeId,
        /// Parameter key.
        key: String,
        /// Value before the change.
        old: ParamValue,
        /// Value after the change.
        new: ParamValue,
    },
    /// A link was created.
    LinkCreated(Link),
    /// A link was removed.
    LinkDeleted(Link),
}

impl HistoryAction {
    /// Stable action name: `new`, `delete`, `update`, `link_create` or `link_delete`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NodeCreated(_) => "new",
            Self::NodeDeleted { .. } => "delete",
            Self::ParamUpdated { .. } => "update",
            Self::LinkCreated(_) => "link_create",
            Self::LinkDeleted(_) => "link_delete",
        }
    }
}

/// Entry of the linear history list.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryEntry {
    /// Subject of the entry: a node label or a link id.
    pub tag: String,
    /// What happened.
    pub action: HistoryAction,
}

impl HistoryEntry {
    /// A node was added.
    pub fn node_created(node: NodeSnapshot) -> Self {
        Self {
            tag: node.label.clone(),
            action: HistoryAction::NodeCreated(node),
        }
    }

    /// A node was removed together with `links`.
    pub fn node_deleted(node: NodeSnapshot, links: Vec<Link>) -> Self {
        Self {
            tag: node.label.clone(),
            action: HistoryAction::NodeDeleted { node, links },
        }
    }

    /// Parameter `key` of `node` changed from `old` to `new`.
    pub fn param_updated(
        label: &str,
        node: NodeId,
        key: &str,
        old: ParamValue,
        new: ParamValue,
    ) -> Self {
        Self {
            tag: label.to_string(),
            action: HistoryAction::ParamUpdated {
                node,
                key: key.to_string(),
                old,
                new,
            },
        }
    }

    /// A link was connected.
    pub fn link_created(link: Link) -> Self {
        Self {
            tag: link.id.to_string(),
            action: HistoryAction::LinkCreated(link),
        }
    }

    /// A link was removed.
    pub fn link_deleted(link: Link) -> Self {
        Self {
            tag: link.id.to_string(),
            action: HistoryAction::LinkDeleted(link),
        }
    }
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.action {
            HistoryAction::ParamUpdated { key, old, new, .. } => {
                write!(f, "update {}.{key}: {old} -> {new}", self.tag)
            }
            action => write!(f, "{} {}", action.name(), self.tag),
        }
    }
}
