//! Undo/redo log.

pub mod entry;
pub mod manager;
