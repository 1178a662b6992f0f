use crate::{
    catalog::params::ParamValue,
    foundation::core::{LinkId, NodeId},
    foundation::error::{ChainError, ChainResult},
    graph::{links::Link, store::NodeSnapshot},
    history::entry::{HistoryAction, HistoryEntry},
};

/// Mutations a history step needs from the graph it replays against.
///
/// None of these record history; replay goes through this trait only.
pub trait Replay {
    /// Re-insert a node verbatim.
    fn restore_node(&mut self, node: &NodeSnapshot) -> ChainResult<()>;
    /// Remove a node and its incident links, returning the node's final state.
    fn remove_node(&mut self, id: NodeId) -> ChainResult<NodeSnapshot>;
    /// Overwrite one parameter value.
    fn write_param(&mut self, id: NodeId, key: &str, value: &ParamValue) -> ChainResult<()>;
    /// Re-insert a link under its recorded id.
    fn restore_link(&mut self, link: &Link) -> ChainResult<()>;
    /// Remove a link that must currently exist.
    fn remove_link(&mut self, id: LinkId) -> ChainResult<()>;
}

/// Behaviour switches for [`History`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HistoryOpts {
    /// Merge consecutive updates of the same node parameter into one entry.
    pub coalesce_param_updates: bool,
    /// Keep at most this many entries, dropping the oldest.
    pub limit: Option<usize>,
}

/// Linear undo/redo log with a cursor.
///
/// `cursor` is the index of the last applied entry; `None` means nothing is applied.
#[derive(Clone, Debug, Default)]
pub struct History {
    entries: Vec<HistoryEntry>,
    cursor: Option<usize>,
    opts: HistoryOpts,
}

impl History {
    /// Empty history.
    pub fn new(opts: HistoryOpts) -> Self {
        Self {
            entries: Vec::new(),
            cursor: None,
            opts,
        }
    }

    /// Recorded entries, oldest first.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Index of the last applied entry.
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether an applied entry is left to undo.
    pub fn can_undo(&self) -> bool {
        self.cursor.is_some()
    }

    /// Whether an undone entry is left to redo.
    pub fn can_redo(&self) -> bool {
        self.next_index() < self.entries.len()
    }

    fn next_index(&self) -> usize {
        self.cursor.map_or(0, |i| i + 1)
    }

    /// Forget every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }

    /// Append `entry`, discarding everything after the cursor.
    pub fn record(&mut self, entry: HistoryEntry) {
        let keep = self.next_index();
        if keep < self.entries.len() {
            tracing::debug!(dropped = self.entries.len() - keep, "discarding redo branch");
            self.entries.truncate(keep);
        }

        if self.opts.coalesce_param_updates && self.merge_update(&entry) {
            return;
        }

        tracing::debug!(%entry, "record");
        self.entries.push(entry);
        if let Some(limit) = self.opts.limit {
            let excess = self.entries.len().saturating_sub(limit);
            if excess > 0 {
                self.entries.drain(..excess);
            }
        }
        self.cursor = self.entries.len().checked_sub(1);
    }

    fn merge_update(&mut self, entry: &HistoryEntry) -> bool {
        let HistoryAction::ParamUpdated {
            node, key, new, ..
        } = &entry.action
        else {
            return false;
        };
        let Some(HistoryEntry {
            action:
                HistoryAction::ParamUpdated {
                    node: last_node,
                    key: last_key,
                    old: last_old,
                    new: last_new,
                },
            ..
        }) = self.entries.last_mut()
        else {
            return false;
        };
        if last_node != node || last_key != key {
            return false;
        }
        *last_new = new.clone();
        let round_trip = last_old == last_new;
        tracing::debug!(%entry, round_trip, "coalesced into previous update");
        if round_trip {
            self.entries.pop();
            self.cursor = self.entries.len().checked_sub(1);
        }
        true
    }

    /// Step back once. Returns `Ok(false)` when there is nothing to undo.
    ///
    /// A failing step snaps the cursor to the end of the list.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn undo(&mut self, target: &mut dyn Replay) -> ChainResult<bool> {
        let Some(index) = self.cursor else {
            return Ok(false);
        };
        let entry = &mut self.entries[index];
        match apply_inverse(entry, target) {
            Ok(()) => {
                tracing::debug!(%entry, "undo");
                self.cursor = index.checked_sub(1);
                Ok(true)
            }
            Err(err) => Err(self.fail("undo", index, err)),
        }
    }

    /// Step forward once. Returns `Ok(false)` when there is nothing to redo.
    ///
    /// A failing step snaps the cursor to the end of the list.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn redo(&mut self, target: &mut dyn Replay) -> ChainResult<bool> {
        let index = self.next_index();
        let Some(entry) = self.entries.get(index) else {
            return Ok(false);
        };
        match apply_forward(entry, target) {
            Ok(()) => {
                tracing::debug!(%entry, "redo");
                self.cursor = Some(index);
                Ok(true)
            }
            Err(err) => Err(self.fail("redo", index, err)),
        }
    }

    fn fail(&mut self, step: &str, index: usize, err: ChainError) -> ChainError {
        let entry = &self.entries[index];
        tracing::warn!(%entry, %err, "{step} failed, moving cursor to end of history");
        let msg = format!("{step} of '{entry}' failed: {err}");
        self.cursor = self.entries.len().checked_sub(1);
        ChainError::history_replay(msg)
    }
}

fn apply_forward(entry: &HistoryEntry, target: &mut dyn Replay) -> ChainResult<()> {
    match &entry.action {
        HistoryAction::NodeCreated(node) => target.restore_node(node),
        HistoryAction::NodeDeleted { node, .. } => target.remove_node(node.id).map(|_| ()),
        HistoryAction::ParamUpdated { node, key, new, .. } => target.write_param(*node, key, new),
        HistoryAction::LinkCreated(link) => target.restore_link(link),
        HistoryAction::LinkDeleted(link) => target.remove_link(link.id),
    }
}

fn apply_inverse(entry: &mut HistoryEntry, target: &mut dyn Replay) -> ChainResult<()> {
    match &mut entry.action {
        HistoryAction::NodeCreated(node) => {
            let current = target.remove_node(node.id)?;
            node.position = current.position;
            Ok(())
        }
        HistoryAction::NodeDeleted { node, links } => {
            target.restore_node(node)?;
            for link in links.iter() {
                target.restore_link(link)?;
            }
            Ok(())
        }
        HistoryAction::ParamUpdated { node, key, old, .. } => target.write_param(*node, key, old),
        HistoryAction::LinkCreated(link) => target.remove_link(link.id),
        HistoryAction::LinkDeleted(link) => target.restore_link(link),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/history/manager.rs"]
mod tests;
